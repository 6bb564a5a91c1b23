use anyhow::Context;
use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims, Role};
use crate::cli::{utils::output_success, OutputFormat};

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(long, help = "User or associate id to put in the token subject")]
    pub user: Uuid,

    #[arg(long, default_value = "user", help = "Token role: user or associate")]
    pub role: String,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let role: Role = args
        .role
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown role '{}', expected user or associate", args.role))?;
    let claims = Claims::new(args.user, role);
    let token = generate_jwt(&claims).context("failed to sign token")?;

    match output_format {
        OutputFormat::Json => output_success(
            output_format,
            "Token issued",
            Some(json!({ "token": token, "sub": args.user, "exp": claims.exp })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
