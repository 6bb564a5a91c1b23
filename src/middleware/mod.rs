pub mod auth;
pub mod extract;
pub mod invite_token;
pub mod onboarding_token;
pub mod response;
pub mod validate_associate;
pub mod validate_user;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use extract::{JsonBody, PathId};
pub use invite_token::{invite_token_middleware, InviteContext};
pub use onboarding_token::{onboarding_token_middleware, OnboardingContext};
pub use response::{ApiResponse, ApiResult};
pub use validate_associate::{validate_associate_middleware, CurrentAssociate};
pub use validate_user::{validate_user_middleware, CurrentUser};
