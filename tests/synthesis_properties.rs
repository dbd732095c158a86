use meshgate::domain::{Destination, Handler, RawConfig, StringMatch};
use meshgate::registry::HandlerRegistry;
use meshgate::synthesis::{merge_candidates, method_match, uri_match, RouteCandidate};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

fn candidate_strategy() -> impl Strategy<Value = RouteCandidate> {
    (
        prop::sample::select(vec!["/a", "/b", "/c/.*"]),
        prop::collection::vec(prop::sample::select(vec!["GET", "POST", "PUT"]), 0..3),
        prop::sample::select(vec!["proxy", "svc"]),
        prop::option::of(prop::sample::select(vec!["1", "2"])),
    )
        .prop_map(|(path, methods, host, header)| {
            let mut methods: Vec<String> = methods.into_iter().map(String::from).collect();
            methods.dedup();
            let mut request_headers = BTreeMap::new();
            if let Some(value) = header {
                request_headers.insert("x-a".to_string(), value.to_string());
            }
            RouteCandidate {
                path: path.to_string(),
                methods,
                destination: Destination::new(host, 80),
                request_headers,
                timeout: Duration::from_secs(180),
            }
        })
}

type GroupKey = (String, String, BTreeMap<String, String>);

fn key(candidate: &RouteCandidate) -> GroupKey {
    (
        candidate.path.clone(),
        candidate.destination.host.clone(),
        candidate.request_headers.clone(),
    )
}

proptest! {
    #[test]
    fn non_catch_all_paths_are_regex_matches(path in "/[a-z0-9/.*]{0,16}") {
        prop_assume!(path != "/*");
        prop_assert_eq!(uri_match(&path), StringMatch::Regex(path.clone()));
    }

    #[test]
    fn method_regex_lists_every_method(methods in prop::collection::vec("[A-Z]{3,7}", 1..5)) {
        let Some(StringMatch::Regex(pattern)) = method_match(&methods) else {
            return Err(TestCaseError::fail("expected a regex"));
        };
        prop_assert!(pattern.starts_with("^(") && pattern.ends_with(")$"));
        for method in &methods {
            prop_assert!(pattern.contains(method.as_str()));
        }
    }

    #[test]
    fn merging_keeps_one_route_per_group(
        candidates in prop::collection::vec(candidate_strategy(), 0..12)
    ) {
        let merged = merge_candidates(candidates.clone());

        let mut first_seen: Vec<GroupKey> = Vec::new();
        for candidate in &candidates {
            if !first_seen.contains(&key(candidate)) {
                first_seen.push(key(candidate));
            }
        }
        let merged_keys: Vec<GroupKey> = merged.iter().map(key).collect();
        prop_assert_eq!(&merged_keys, &first_seen);

        for route in &merged {
            let group: Vec<&RouteCandidate> =
                candidates.iter().filter(|c| key(c) == key(route)).collect();
            if group.iter().any(|c| c.methods.is_empty()) {
                prop_assert!(route.methods.is_empty());
            } else {
                let expected: BTreeSet<&String> =
                    group.iter().flat_map(|c| c.methods.iter()).collect();
                let actual: BTreeSet<&String> = route.methods.iter().collect();
                prop_assert_eq!(actual, expected);
                prop_assert_eq!(route.methods.len(), expected_len(&group));
            }
        }
    }

    #[test]
    fn header_mutator_never_replaces_forwarded_headers(
        host in "[a-z]{1,10}\\.example\\.com",
        spoofed in "[a-z]{1,10}",
        extra in prop::collection::btree_map("x-[a-z]{1,8}", "[a-z0-9]{1,8}", 0..4),
    ) {
        let mut config = extra.clone();
        config.insert("X-Forwarded-Host".to_string(), spoofed);
        let handler = Handler::with_config(
            "header",
            RawConfig::from_value(&serde_json::json!({ "headers": config })),
        );

        let mut headers = BTreeMap::new();
        headers.insert("x-forwarded-host".to_string(), host.clone());

        let registry = HandlerRegistry::default();
        let mutator = registry.mutator("header").expect("header mutator");
        mutator.contribute_headers(&handler, &mut headers).expect("render headers");

        prop_assert_eq!(headers.get("x-forwarded-host"), Some(&host));
        prop_assert!(!headers.contains_key("X-Forwarded-Host"));
        for (name, value) in &extra {
            if !name.starts_with("x-forwarded-") {
                prop_assert_eq!(headers.get(name), Some(value));
            }
        }
    }
}

fn expected_len(group: &[&RouteCandidate]) -> usize {
    group.iter().flat_map(|c| c.methods.iter()).collect::<BTreeSet<_>>().len()
}
