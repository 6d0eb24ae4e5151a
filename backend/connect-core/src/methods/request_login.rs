//! Identity signing for "login with the device".
//!
//! The challenge is either passed in the call or, with `asyncChallenge`,
//! fetched from the caller mid-run through a login challenge round trip.

use crate::error::ConnectError;
use crate::firmware::get_firmware_range;
use crate::method::{Method, MethodContext, MethodDescriptor, MethodEnv};
use crate::params::{FieldSpec, FieldType, validate_params};
use crate::ui::UiOutcome;

use models::{Permission, UiEvent, UiMessage};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};

pub const METHOD_NAME: &str = "requestLogin";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Identity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proto: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

impl Identity {
    /// `https://example.com:8080` -> proto `https`, host `example.com`,
    /// port `8080`.
    pub fn from_origin(origin: &str) -> Self {
        if origin.is_empty() {
            return Self::default();
        }
        let mut parts = origin.split(':');
        let proto = parts.next().map(str::to_string);
        let host = parts
            .next()
            .map(|h| h.trim_start_matches('/').to_string());
        let port = parts.next().map(str::to_string);
        Self {
            proto,
            host,
            port,
            index: Some(0),
        }
    }
}

pub struct RequestLogin {
    descriptor: MethodDescriptor,
    identity: Identity,
    challenge_hidden: String,
    challenge_visual: String,
    async_challenge: bool,
}

impl RequestLogin {
    pub fn build(
        mut descriptor: MethodDescriptor,
        payload: &Value,
        env: &MethodEnv,
    ) -> Result<Box<dyn Method>, ConnectError> {
        descriptor.required_permissions = vec![Permission::Read, Permission::Write];
        descriptor.firmware_range = get_firmware_range(
            &descriptor.name,
            None,
            &descriptor.firmware_range,
            &env.firmware,
        );
        descriptor.info = "Login".to_string();
        descriptor.common.use_empty_passphrase = true;

        validate_params(
            payload,
            &[
                FieldSpec::new("challengeHidden", FieldType::String),
                FieldSpec::new("challengeVisual", FieldType::String),
                FieldSpec::new("asyncChallenge", FieldType::Boolean),
            ],
        )?;

        let text = |name: &str| payload.get(name).and_then(Value::as_str).unwrap_or("").to_string();

        Ok(Box::new(Self {
            descriptor,
            identity: Identity::from_origin(&env.settings.origin),
            challenge_hidden: text("challengeHidden"),
            challenge_visual: text("challengeVisual"),
            async_challenge: payload
                .get("asyncChallenge")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }))
    }

    /// Ask the caller for the challenge pair.
    async fn fetch_challenge(&self, ctx: &MethodContext) -> Result<(String, String), ConnectError> {
        let promise = ctx
            .create_ui_promise(UiEvent::LoginChallengeResponse, Value::Null)
            .await;
        ctx.post_message(UiMessage::empty(UiEvent::LoginChallengeRequest));

        let answer = match promise.wait().await {
            UiOutcome::Resolved(answer) => answer,
            UiOutcome::Cancelled => return Err(ConnectError::action_cancelled()),
        };

        if let Some(reason) = answer.as_str() {
            return Err(ConnectError::runtime(format!(
                "requestLogin callback error: {reason}"
            )));
        }

        validate_params(
            &answer,
            &[
                FieldSpec::new("challengeHidden", FieldType::String).required(),
                FieldSpec::new("challengeVisual", FieldType::String).required(),
            ],
        )?;

        let text = |name: &str| answer[name].as_str().unwrap_or_default().to_string();
        Ok((text("challengeHidden"), text("challengeVisual")))
    }
}

#[async_trait]
impl Method for RequestLogin {
    fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    async fn run(&self, ctx: &MethodContext) -> Result<Value, ConnectError> {
        let (challenge_hidden, challenge_visual) = if self.async_challenge {
            self.fetch_challenge(ctx).await?
        } else {
            (self.challenge_hidden.clone(), self.challenge_visual.clone())
        };

        let reply = ctx
            .commands()?
            .typed_call(
                "SignIdentity",
                "SignedIdentity",
                json!({
                    "identity": self.identity,
                    "challenge_hidden": challenge_hidden,
                    "challenge_visual": challenge_visual,
                }),
            )
            .await?;

        Ok(json!({
            "address": reply.message["address"],
            "publicKey": reply.message["public_key"],
            "signature": reply.message["signature"],
        }))
    }
}
