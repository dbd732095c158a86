//! Cross-rule JWT consistency
//!
//! All authentications for one issuer must read the token from the same place,
//! whichever rule or handler they appear in.

use crate::domain::{AttributePath, JwtConfig, Problem, Rule, TokenLocation};
use crate::registry::AccessStrategyKind;
use std::collections::HashMap;

pub const DIFFERING_ISSUER_CONFIG: &str =
    "multiple jwt configurations that differ for the same issuer";

#[derive(Debug, Clone, Copy, Default)]
pub struct RulesValidator;

impl RulesValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `rules`; `path` locates the rule list itself
    pub fn validate(&self, path: &AttributePath, rules: &[Rule]) -> Vec<Problem> {
        let mut first_seen: HashMap<String, TokenLocation> = HashMap::new();
        let mut problems = Vec::new();

        for (rule_idx, rule) in rules.iter().enumerate() {
            for (strategy_idx, strategy) in rule.access_strategies.iter().enumerate() {
                if strategy.name != AccessStrategyKind::Jwt.as_str() {
                    continue;
                }
                // Undecodable payloads are reported by the handler validator
                let Some(config) =
                    strategy.config.as_ref().and_then(|raw| raw.decode::<JwtConfig>().ok())
                else {
                    continue;
                };

                for (auth_idx, authentication) in config.authentications.into_iter().enumerate() {
                    let location = authentication.token_location();
                    match first_seen.get(&authentication.issuer) {
                        Some(expected) if *expected != location => {
                            problems.push(
                                path.index(rule_idx)
                                    .field("accessStrategy")
                                    .index(strategy_idx)
                                    .field("config")
                                    .field("authentications")
                                    .index(auth_idx)
                                    .problem(DIFFERING_ISSUER_CONFIG),
                            );
                        }
                        Some(_) => {}
                        None => {
                            first_seen.insert(authentication.issuer, location);
                        }
                    }
                }
            }
        }

        problems
    }
}
