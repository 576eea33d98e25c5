use ip_classify::{classify, parse_address, AddressInput, Classification};

/// Parse every haystack entry and compare the reserved/public verdicts.
fn check_classification(inputs: &[&str], expect_reserved: bool) {
    for input in inputs {
        let ip = parse_address(AddressInput::Text(input))
            .unwrap_or_else(|| panic!("expected {input:?} to parse"));
        assert_eq!(
            classify(ip).is_reserved(),
            expect_reserved,
            "\nFailed for address: {input}\n"
        );
    }
}

#[test]
fn test_reserved_ipv4() {
    check_classification(
        &[
            "127.0.0.1",
            "10.0.0.5",
            "172.16.4.4",
            "192.168.1.1",
            "169.254.10.10",
            "100.64.0.1",
            "0.0.0.0",
            "192.0.2.44",
            "198.51.100.7",
            "203.0.113.9",
            "198.19.0.1",
            "224.0.0.251",
            "239.255.255.250",
            "240.0.0.1",
            "255.255.255.255",
        ],
        true,
    );
}

#[test]
fn test_public_ipv4() {
    check_classification(
        &["8.8.8.8", "1.1.1.1", "81.2.69.205", "67.43.156.1", "172.32.0.1", "11.0.0.1"],
        false,
    );
}

#[test]
fn test_reserved_ipv6() {
    check_classification(
        &[
            "::1",
            "::",
            "fe80::1",
            "fc00::1",
            "fd00:1234::1",
            "ff02::1",
            "2001:db8::1",
            "64:ff9b::808:808",
            "::ffff:10.1.2.3",
        ],
        true,
    );
}

#[test]
fn test_public_ipv6() {
    check_classification(
        &["2001:4860:4860::8888", "240b::beef:0:24", "2606:4700:4700::1111", "::ffff:8.8.8.8"],
        false,
    );
}

#[test]
fn test_rejects_non_addresses() {
    for input in [
        "not-an-ip",
        "999.999.1.1",
        "1.2.3",
        "1.2.3.4.5",
        "",
        "   ",
        "::g",
        "8.8.8.8:53",
        "[::1]",
    ] {
        assert_eq!(parse_address(AddressInput::Text(input)), None, "{input:?}");
    }
}

#[test]
fn test_typed_and_other_inputs() {
    let ip = "192.168.1.1".parse().unwrap();
    assert_eq!(parse_address(AddressInput::Address(ip)), Some(ip));
    assert_eq!(parse_address(AddressInput::Other), None);
}

#[test]
fn test_range_names() {
    let name = |s: &str| match classify(s.parse().unwrap()) {
        Classification::Reserved(range) => range.name,
        Classification::Public => "public",
    };
    assert_eq!(name("127.0.0.1"), "loopback");
    assert_eq!(name("10.0.0.5"), "private-use");
    assert_eq!(name("169.254.1.1"), "link-local");
    assert_eq!(name("224.0.0.1"), "multicast");
    assert_eq!(name("::1"), "loopback");
    assert_eq!(name("8.8.8.8"), "public");
}
