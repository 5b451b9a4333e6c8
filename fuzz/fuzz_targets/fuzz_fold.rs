// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell
#![no_main]

use arbitrary::Arbitrary;
use gitreview::aggregate::{Categories, OwnershipFilter};
use gitreview::types::Report;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    owner: String,
    reports: Vec<(u8, bool, String, String, String, String)>,
}

fuzz_target!(|input: Input| {
    let reports: Vec<Report> = input
        .reports
        .into_iter()
        .enumerate()
        .map(|(i, (dir, omitted, status, error, fetch, rev_list))| Report {
            repo_path: format!("/src/{dir}/{i}").into(),
            omitted,
            status_output: status,
            fetch_error: error,
            fetch_output: fetch,
            rev_list_output: rev_list,
            ..Report::default()
        })
        .collect();

    let owner = OwnershipFilter::new(&input.owner);
    let categories = Categories::fold(&reports, &owner);

    let mut reversed = reports.clone();
    reversed.reverse();
    assert_eq!(categories, Categories::fold(&reversed, &owner));

    for path in categories.journal.keys() {
        assert!(categories.fetched.contains_key(path));
        assert!(owner.matches(path));
    }
});
