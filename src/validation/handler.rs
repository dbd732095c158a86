//! Per-handler payload validation
//!
//! Each access strategy and mutator validates its own config in isolation. Every
//! check runs; problems accumulate in the returned vector.

use super::scalars::{check_string_list, has_blank, is_valid_url};
use crate::domain::{
    AttributePath, CookieMutatorConfig, Handler, HeaderMutatorConfig, JwtConfig,
    Oauth2IntrospectionConfig, Problem,
};
use std::collections::BTreeMap;

pub const EMPTY_CONFIG: &str = "supplied config cannot be empty";
pub const NO_AUTHENTICATIONS: &str = "Authentications are required when using JWT access handler";
pub const INVALID_URL: &str = "value is empty or not a valid url";
pub const MULTIPLE_FROM_HEADERS: &str = "multiple fromHeaders are not supported";
pub const MULTIPLE_FROM_PARAMS: &str = "multiple fromParams are not supported";
pub const MIXED_TOKEN_LOCATIONS: &str =
    "mixture of multiple fromHeaders and fromParams is not supported";
pub const EMPTY_AUTHORIZATION: &str = "authorization is empty";

/// Problem text for an undecodable payload
pub fn unreadable_json(error: impl std::fmt::Display) -> String {
    format!("Can't read json: {}", error)
}

/// Validates the config of a `jwt` access strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtHandlerValidator;

impl JwtHandlerValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate one jwt handler located at `path`
    pub fn validate(&self, path: &AttributePath, handler: &Handler) -> Vec<Problem> {
        let config_path = path.field("config");

        let raw = match handler.config.as_ref() {
            Some(raw) if !raw.is_empty() => raw,
            _ => return vec![config_path.problem(EMPTY_CONFIG)],
        };

        let config: JwtConfig = match raw.decode() {
            Ok(config) => config,
            Err(e) => return vec![config_path.problem(unreadable_json(e))],
        };

        let mut problems = Vec::new();

        if config.authentications.is_empty() {
            problems.push(config_path.problem(NO_AUTHENTICATIONS));
        }

        let mut seen_headers = false;
        let mut seen_params = false;
        for (i, authentication) in config.authentications.iter().enumerate() {
            let auth_path = config_path.field("authentications").index(i);

            if !is_valid_url(&authentication.issuer) {
                problems.push(auth_path.field("issuer").problem(INVALID_URL));
            }
            if !is_valid_url(&authentication.jwks_uri) {
                problems.push(auth_path.field("jwksUri").problem(INVALID_URL));
            }

            if authentication.from_headers.len() > 1 {
                problems.push(auth_path.field("fromHeaders").problem(MULTIPLE_FROM_HEADERS));
            }
            if authentication.from_params.len() > 1 {
                problems.push(auth_path.field("fromParams").problem(MULTIPLE_FROM_PARAMS));
            }

            let uses_headers = !authentication.from_headers.is_empty();
            let uses_params = !authentication.from_params.is_empty();
            if (uses_headers && uses_params)
                || (uses_headers && seen_params)
                || (uses_params && seen_headers)
            {
                problems.push(auth_path.field("fromHeaders").problem(MIXED_TOKEN_LOCATIONS));
            }
            seen_headers |= uses_headers;
            seen_params |= uses_params;
        }

        for (i, authorization) in config.authorizations.iter().enumerate() {
            let authz_path = config_path.field("authorizations").index(i);
            let Some(authorization) = authorization else {
                problems.push(authz_path.problem(EMPTY_AUTHORIZATION));
                continue;
            };

            if let Some(scopes) = &authorization.required_scopes {
                problems.extend(check_string_list(
                    &authz_path.field("requiredScopes"),
                    scopes,
                    "scope value is empty",
                ));
            }
            if let Some(audiences) = &authorization.audiences {
                problems.extend(check_string_list(
                    &authz_path.field("audiences"),
                    audiences,
                    "audience value is empty",
                ));
            }
        }

        problems
    }
}

/// Handlers that take no configuration
pub fn validate_without_config(path: &AttributePath, handler: &Handler) -> Vec<Problem> {
    if handler.config_is_empty() {
        Vec::new()
    } else {
        vec![path
            .field("config")
            .problem(format!("strategy: {} does not support configuration", handler.name))]
    }
}

/// Handlers whose optional config must be a JSON object
pub fn validate_optional_object(path: &AttributePath, handler: &Handler) -> Vec<Problem> {
    let Some(raw) = handler.config.as_ref().filter(|raw| !raw.is_empty()) else {
        return Vec::new();
    };
    match raw.decode::<serde_json::Value>() {
        Ok(serde_json::Value::Object(_)) => Vec::new(),
        Ok(_) => {
            vec![path.field("config").problem(unreadable_json("config must be a JSON object"))]
        }
        Err(e) => vec![path.field("config").problem(unreadable_json(e))],
    }
}

/// Token introspection settings read by the external proxy
pub fn validate_oauth2_introspection(path: &AttributePath, handler: &Handler) -> Vec<Problem> {
    let problems = validate_optional_object(path, handler);
    if !problems.is_empty() {
        return problems;
    }
    let Some(raw) = handler.config.as_ref().filter(|raw| !raw.is_empty()) else {
        return problems;
    };

    match raw.decode::<Oauth2IntrospectionConfig>() {
        Ok(config) => match config.required_scope {
            Some(scopes) if has_blank(&scopes) => {
                vec![path.field("config").field("required_scope").problem("scope value is empty")]
            }
            _ => Vec::new(),
        },
        Err(e) => vec![path.field("config").problem(unreadable_json(e))],
    }
}

/// Mutators that accept any decodable config
pub fn validate_decodable(path: &AttributePath, handler: &Handler) -> Vec<Problem> {
    match handler.config.as_ref().filter(|raw| !raw.is_empty()) {
        Some(raw) => match raw.decode::<serde_json::Value>() {
            Ok(_) => Vec::new(),
            Err(e) => vec![path.field("config").problem(unreadable_json(e))],
        },
        None => Vec::new(),
    }
}

pub fn validate_header_mutator(path: &AttributePath, handler: &Handler) -> Vec<Problem> {
    validate_pair_mutator(path, handler, "headers", "header name is empty", |raw| {
        raw.decode::<HeaderMutatorConfig>().map(|c| c.headers)
    })
}

pub fn validate_cookie_mutator(path: &AttributePath, handler: &Handler) -> Vec<Problem> {
    validate_pair_mutator(path, handler, "cookies", "cookie name is empty", |raw| {
        raw.decode::<CookieMutatorConfig>().map(|c| c.cookies)
    })
}

fn validate_pair_mutator<F>(
    path: &AttributePath,
    handler: &Handler,
    field: &str,
    blank_name_message: &str,
    decode: F,
) -> Vec<Problem>
where
    F: Fn(&crate::domain::RawConfig) -> Result<BTreeMap<String, String>, serde_json::Error>,
{
    let config_path = path.field("config");
    let raw = match handler.config.as_ref() {
        Some(raw) if !raw.is_empty() => raw,
        _ => return vec![config_path.problem(EMPTY_CONFIG)],
    };

    let pairs = match decode(raw) {
        Ok(pairs) => pairs,
        Err(e) => return vec![config_path.problem(unreadable_json(e))],
    };

    let field_path = config_path.field(field);
    if pairs.is_empty() {
        return vec![field_path.problem("value is empty")];
    }
    if pairs.keys().any(|k| k.trim().is_empty()) {
        return vec![field_path.problem(blank_name_message)];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawConfig;
    use serde_json::json;

    fn jwt(config: serde_json::Value) -> Handler {
        Handler::with_config("jwt", RawConfig::from_value(&config))
    }

    fn messages(problems: &[Problem]) -> Vec<&str> {
        problems.iter().map(|p| p.message.as_str()).collect()
    }

    #[test]
    fn valid_jwt_config_has_no_problems() {
        let handler = jwt(json!({
            "authentications": [{
                "issuer": "https://issuer.example.com",
                "jwksUri": "file://path/to/jwks.json",
                "fromHeaders": [{"name": "x-token", "prefix": "Bearer "}]
            }],
            "authorizations": [{"requiredScopes": ["read"], "audiences": ["api"]}, {}]
        }));
        assert!(JwtHandlerValidator.validate(&AttributePath::new(""), &handler).is_empty());
    }

    #[test]
    fn multiple_token_sources_are_reported() {
        let handler = jwt(json!({
            "authentications": [{
                "issuer": "https://issuer.example.com",
                "jwksUri": "https://issuer.example.com/jwks",
                "fromHeaders": [{"name": "a"}, {"name": "b"}],
                "fromParams": ["c", "d"]
            }]
        }));
        let problems = JwtHandlerValidator.validate(&AttributePath::new(""), &handler);
        assert_eq!(
            messages(&problems),
            vec![MULTIPLE_FROM_HEADERS, MULTIPLE_FROM_PARAMS, MIXED_TOKEN_LOCATIONS]
        );
        assert_eq!(problems[0].attribute_path, ".config.authentications[0].fromHeaders");
        assert_eq!(problems[1].attribute_path, ".config.authentications[0].fromParams");
        assert_eq!(problems[2].attribute_path, ".config.authentications[0].fromHeaders");
    }

    #[test]
    fn mixture_across_authentications_lands_on_later_one() {
        let handler = jwt(json!({
            "authentications": [
                {"issuer": "https://a.example.com", "jwksUri": "https://a.example.com/jwks",
                 "fromHeaders": [{"name": "x-token"}]},
                {"issuer": "https://b.example.com", "jwksUri": "https://b.example.com/jwks",
                 "fromParams": ["token"]}
            ]
        }));
        let problems =
            JwtHandlerValidator.validate(&AttributePath::new("some.attribute"), &handler);
        assert_eq!(problems.len(), 1);
        assert_eq!(
            problems[0].attribute_path,
            "some.attribute.config.authentications[1].fromHeaders"
        );
        assert_eq!(problems[0].message, MIXED_TOKEN_LOCATIONS);
    }

    #[test]
    fn null_authorization_is_reported() {
        let handler = jwt(json!({
            "authentications": [
                {"issuer": "https://a.example.com", "jwksUri": "https://a.example.com/jwks"}
            ],
            "authorizations": [null]
        }));
        let problems = JwtHandlerValidator.validate(&AttributePath::new(""), &handler);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].attribute_path, ".config.authorizations[0]");
        assert_eq!(problems[0].message, EMPTY_AUTHORIZATION);
    }

    #[test]
    fn no_config_strategies_reject_payloads() {
        let path = AttributePath::new(".rule");
        assert!(validate_without_config(&path, &Handler::new("allow")).is_empty());

        let handler = Handler::with_config("noop", RawConfig::from_value(&json!({"a": 1})));
        let problems = validate_without_config(&path, &handler);
        assert_eq!(problems[0].attribute_path, ".rule.config");
        assert_eq!(problems[0].message, "strategy: noop does not support configuration");
    }

    #[test]
    fn introspection_scope_check() {
        let path = AttributePath::new("");
        let handler = Handler::with_config(
            "oauth2_introspection",
            RawConfig::from_value(&json!({"required_scope": ["read", " "]})),
        );
        let problems = validate_oauth2_introspection(&path, &handler);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].attribute_path, ".config.required_scope");

        let broken = Handler::with_config("oauth2_introspection", RawConfig::from_bytes("[1]"));
        assert!(validate_oauth2_introspection(&path, &broken)[0]
            .message
            .starts_with("Can't read json: "));

        let unconfigured = Handler::new("oauth2_introspection");
        assert!(validate_oauth2_introspection(&path, &unconfigured).is_empty());
    }

    #[test]
    fn header_and_cookie_mutator_checks() {
        let path = AttributePath::new("");
        assert_eq!(
            messages(&validate_header_mutator(&path, &Handler::new("header"))),
            vec![EMPTY_CONFIG]
        );

        let empty_map =
            Handler::with_config("header", RawConfig::from_value(&json!({"headers": {}})));
        let problems = validate_header_mutator(&path, &empty_map);
        assert_eq!(problems[0].attribute_path, ".config.headers");
        assert_eq!(problems[0].message, "value is empty");

        let blank_name = Handler::with_config(
            "cookie",
            RawConfig::from_value(&json!({"cookies": {"": "v"}})),
        );
        assert_eq!(
            messages(&validate_cookie_mutator(&path, &blank_name)),
            vec!["cookie name is empty"]
        );

        let valid = Handler::with_config(
            "cookie",
            RawConfig::from_value(&json!({"cookies": {"x-test-cookie-1": "cookie-value1"}})),
        );
        assert!(validate_cookie_mutator(&path, &valid).is_empty());
    }

    #[test]
    fn decodable_mutators() {
        let path = AttributePath::new("");
        assert!(validate_decodable(&path, &Handler::new("idtoken")).is_empty());
        let broken = Handler::with_config("idtoken", RawConfig::from_bytes("{oops"));
        assert_eq!(validate_decodable(&path, &broken).len(), 1);
    }
}
