// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2026 Jonathan D.A. Jewell
#![no_main]

use gitreview::git::{parse_remote_head, parse_rev_list};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let divergence = parse_rev_list(text);
    let marked = text
        .lines()
        .filter(|line| line.starts_with('<') || line.starts_with('>'))
        .count();
    assert_eq!(
        divergence.ahead.lines().count() + divergence.behind.lines().count(),
        marked
    );

    if let Some(branch) = parse_remote_head(text) {
        assert!(!branch.is_empty());
    }
});
