#![no_main]

use adscope::airtable::Page;
use adscope::introspect::{SummaryBuilder, ELLIPSIS, PREVIEW_LIMIT};
use libfuzzer_sys::fuzz_target;
use std::collections::HashSet;

// Decodes a records page and folds it into a summary, checking that ids
// stay unique and previews respect the length limit.
fuzz_target!(|data: &[u8]| {
    let page: Page = match serde_json::from_slice(data) {
        Ok(page) => page,
        Err(_) => return,
    };

    let mut builder = SummaryBuilder::new(Some("fake".to_string()));
    builder.page_received();
    for record in page.records {
        builder.push(record);
    }
    let summary = builder.finish("appFuzz", "fuzz");

    let unique: HashSet<&String> = summary.record_ids.iter().collect();
    assert_eq!(unique.len(), summary.record_ids.len());
    assert_eq!(summary.total_records, summary.record_ids.len());
    for field in &summary.fields {
        assert!(field.preview.chars().count() <= PREVIEW_LIMIT + ELLIPSIS.len());
    }
});
