//! 跨平台去重
//!
//! 同一平台 ID 或同一"公司 + 职位"视为重复。保留哪一条由调用方给出的平台优先级决定：
//! 排在前面的平台胜出，列表里没有的平台排在最后，优先级相同保留先出现的。

use std::collections::HashMap;

use tracing::debug;

use crate::models::{JobPosting, Platform};

/// 平台在优先级列表中的位置，越小越优先
fn rank(priority: &[Platform], platform: Platform) -> usize {
    priority
        .iter()
        .position(|p| *p == platform)
        .unwrap_or(priority.len())
}

/// 去重，保持首次出现的位置
pub fn dedup_postings(postings: Vec<JobPosting>, priority: &[Platform]) -> Vec<JobPosting> {
    let total = postings.len();
    let mut kept: Vec<JobPosting> = Vec::with_capacity(total);
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut by_company_title: HashMap<String, usize> = HashMap::new();

    for posting in postings {
        let id_key = posting.id.clone();
        let ct_key = company_title_key(&posting);

        let existing = by_id
            .get(&id_key)
            .or_else(|| ct_key.as_ref().and_then(|k| by_company_title.get(k)))
            .copied();

        match existing {
            None => {
                let slot = kept.len();
                by_id.insert(id_key, slot);
                if let Some(key) = ct_key {
                    by_company_title.insert(key, slot);
                }
                kept.push(posting);
            }
            Some(slot) => {
                if rank(priority, posting.platform) < rank(priority, kept[slot].platform) {
                    debug!(
                        "重复岗位 {} 由 {} 替换为 {}",
                        kept[slot].id, kept[slot].platform, posting.platform
                    );
                    by_id.insert(id_key, slot);
                    if let Some(key) = ct_key {
                        by_company_title.insert(key, slot);
                    }
                    kept[slot] = posting;
                }
            }
        }
    }

    debug!("去重: {} -> {}", total, kept.len());
    kept
}

/// 公司和职位都为空时不参与按内容去重
fn company_title_key(posting: &JobPosting) -> Option<String> {
    if posting.company.trim().is_empty() && posting.title.trim().is_empty() {
        return None;
    }
    Some(posting.company_title_key())
}
