//! Selection filters applied to the decoded parts before any file is touched.
//!
//! Each filter is pure: it splits its input into the parts it keeps and the
//! parts it drops, and the three are applied in sequence (field name, then
//! extension, then count).

use crate::models::UploadedPart;
use crate::utils::validation::extension_of;

#[derive(Debug, Default)]
pub struct Selection {
    pub kept: Vec<UploadedPart>,
    pub dropped: Vec<UploadedPart>,
}

impl Selection {
    fn all(parts: Vec<UploadedPart>) -> Self {
        Self {
            kept: parts,
            dropped: Vec::new(),
        }
    }
}

/// For each allowed value in order, takes the first remaining part that matches.
fn select_in_order<F>(allowed: &[String], parts: Vec<UploadedPart>, matches: F) -> Selection
where
    F: Fn(&UploadedPart, &str) -> bool,
{
    let mut pool: Vec<Option<UploadedPart>> = parts.into_iter().map(Some).collect();
    let mut kept = Vec::new();

    for value in allowed {
        let slot = pool
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|part| matches(part, value.as_str())));
        if let Some(slot) = slot {
            kept.extend(slot.take());
        }
    }

    Selection {
        kept,
        dropped: pool.into_iter().flatten().collect(),
    }
}

/// Keeps parts submitted under an allowed field name, ordered by the allow-list.
pub fn filter_by_field(allowed: Option<&[String]>, parts: Vec<UploadedPart>) -> Selection {
    match allowed {
        Some(names) => select_in_order(names, parts, |part, name| part.field_name == name),
        None => Selection::all(parts),
    }
}

/// Keeps parts whose filename extension is allowed, ordered by the allow-list.
/// Allowed extensions are expected lowercase; file extensions are compared lowercased.
pub fn filter_by_extension(allowed: Option<&[String]>, parts: Vec<UploadedPart>) -> Selection {
    match allowed {
        Some(exts) => select_in_order(exts, parts, |part, ext| {
            extension_of(&part.original_name).is_some_and(|e| e == ext)
        }),
        None => Selection::all(parts),
    }
}

/// Keeps the first `max` parts.
pub fn limit_count(max: Option<usize>, mut parts: Vec<UploadedPart>) -> Selection {
    match max {
        Some(max) if max > 0 && parts.len() > max => {
            let dropped = parts.split_off(max);
            Selection {
                kept: parts,
                dropped,
            }
        }
        _ => Selection::all(parts),
    }
}
