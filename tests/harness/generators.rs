// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for traffic simulation.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Generate distinct, well-formed email addresses.
pub fn generate_emails(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("founder-{}@startup-{}.example.com", i, i / 10))
        .collect()
}

/// Honeypot values a form-filling bot might write.
pub fn generate_honeypot_values() -> Vec<&'static str> {
    vec![
        "spam",
        "https://cheap-pills.example",
        " ",
        "0",
        "a",
        "<script>alert(1)</script>",
    ]
}

/// Email strings that must fail syntax validation.
pub fn generate_malformed_emails() -> Vec<&'static str> {
    vec![
        "",
        "bad",
        "plainaddress",
        "@no-local-part.com",
        "no-at-sign.example.com",
        "two@@example.com",
        "trailing-dot.@example.com",
        ".leading-dot@example.com",
        "double..dot@example.com",
        "spaces in@example.com",
        "no-tld@example",
        "short-tld@example.c",
        "unicode-☃@example.com",
    ]
}
