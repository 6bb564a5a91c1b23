// handlers/public - Endpoints reachable without a session token.
// Invite and onboarding links carry their own signed token in the path.

pub mod invite;
pub mod onboarding;
pub mod user;
