//! Interpretation of status documents returned by the generation service.

use serde_json::Value;

use crate::{StatusResponse, TaskStatus};

const STATUS_COMPLETED: &str = "completed";
const STATUS_FAILED: &str = "failed";

pub fn interpret_status(response: &StatusResponse) -> TaskStatus {
    match response.status.as_deref().unwrap_or_default() {
        STATUS_COMPLETED => TaskStatus::Completed {
            result_urls: extract_result_urls(response),
        },
        STATUS_FAILED => TaskStatus::Failed {
            error: response
                .result
                .as_ref()
                .and_then(|result| result.get("error"))
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
        },
        other => TaskStatus::Pending {
            status: other.to_string(),
        },
    }
}

/// Result URLs from the first source that yields a non-empty list:
/// `extracted_links`, then the cover URLs of `data.imageLinks.item_list`
/// (items without one are skipped), then `image_urls`.
pub fn extract_result_urls(response: &StatusResponse) -> Vec<String> {
    if let Some(links) = non_empty(response.extracted_links.as_deref()) {
        return links.to_vec();
    }

    let covers = cover_urls(response.data.as_ref());
    if !covers.is_empty() {
        return covers;
    }

    non_empty(response.image_urls.as_deref())
        .map(<[String]>::to_vec)
        .unwrap_or_default()
}

fn non_empty(list: Option<&[String]>) -> Option<&[String]> {
    list.filter(|items| !items.is_empty())
}

fn cover_urls(data: Option<&Value>) -> Vec<String> {
    data.and_then(|data| data.pointer("/imageLinks/item_list"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.pointer("/common_attr/cover_url"))
                .filter_map(Value::as_str)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default()
}
