//! Domain types
//!
//! Pure data: the exposure rule set input, handler payloads, the synthesized routing
//! object, validation problems and the cluster objects the core reads. No I/O here.

pub mod handler_config;
pub mod meta;
pub mod problem;
pub mod routing;
pub mod rule_set;
pub mod workload;

pub use handler_config::{
    CookieMutatorConfig, HeaderMutatorConfig, JwtAuthentication, JwtAuthorization, JwtConfig,
    JwtHeader, Oauth2IntrospectionConfig, TokenLocation,
};
pub use meta::{owner_label_value, ObjectMeta, LEGACY_OWNER_LABEL_KEY, OWNER_LABEL_KEY};
pub use problem::{AttributePath, Problem};
pub use routing::{
    Action, Change, CorsPolicy, Destination, HeaderOperations, Headers, HttpMatchRequest,
    HttpRoute, HttpRouteDestination, PortSelector, StringMatch, VirtualService,
    VirtualServiceSpec,
};
pub use rule_set::{
    BackendService, ExposureRuleSet, Handler, RawConfig, Rule, RuleSetSpec, Timeout,
    CATCH_ALL_PATH,
};
pub use workload::{Container, Pod, PodSpec, ServiceObject, ServiceSpec, SIDECAR_CONTAINER_NAME};
