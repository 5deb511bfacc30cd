use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use reqwest::{Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::gateway_trait::{AccessToken, PaymentGateway, PushAcknowledgement, PushRequest};
use super::result_codes::STILL_PROCESSING_ERROR_CODE;
use super::token_cache::TokenCache;
use crate::config::MpesaConfig;
use crate::core::amount::to_gateway_units;
use crate::core::error::{AppError, Result};
use crate::core::phone::mask_msisdn;
use crate::modules::gateways::models::daraja_wire::{
    DarajaErrorBody, StkPushPayload, StkPushResponse, StkQueryPayload, StkQueryResponse,
    TokenResponse,
};
use crate::modules::payments::models::{PaymentResult, ResultSource};

const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3599);

/// Safaricom Daraja STK push client
pub struct DarajaClient {
    /// Plain client for push and query; these are never retried silently
    client: Client,
    /// Retrying client, used only for the idempotent token call
    token_client: ClientWithMiddleware,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
    shortcode: String,
    passkey: String,
    callback_url: String,
    tokens: TokenCache,
}

impl DarajaClient {
    pub fn new(config: &MpesaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(2);
        let token_client = ClientBuilder::new(client.clone())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            token_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            consumer_key: config.consumer_key.clone(),
            consumer_secret: config.consumer_secret.clone(),
            shortcode: config.shortcode.clone(),
            passkey: config.passkey.clone(),
            callback_url: config.callback_url.clone(),
            tokens: TokenCache::new(config.token_ttl_cap),
        })
    }

    /// `base64(shortcode + passkey + timestamp)` together with the timestamp used
    fn password(&self) -> (String, String) {
        let timestamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
        let password = password_for(&self.shortcode, &self.passkey, &timestamp);
        (password, timestamp)
    }

    async fn bearer_token(&self) -> Result<String> {
        self.tokens
            .get_or_acquire(|| self.acquire_access_token())
            .await
    }

    /// POST a JSON body with the cached bearer token
    ///
    /// Returns the status and raw body; transport failures are
    /// `GatewayUnavailable`, and 401/403 drop the cached token.
    async fn post_json<T: Serialize>(&self, path: &str, payload: &T) -> Result<(StatusCode, String)> {
        let token = self.bearer_token().await?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::unavailable(format!("Daraja request to {} failed: {}", path, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::unavailable(format!("Failed to read Daraja response: {}", e)))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.tokens.invalidate().await;
            return Err(AppError::auth(format!("Daraja refused the access token ({})", status)));
        }

        Ok((status, body))
    }
}

pub(crate) fn password_for(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    BASE64.encode(format!("{}{}{}", shortcode, passkey, timestamp))
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Option<T> {
    serde_json::from_str(body).ok()
}

#[async_trait]
impl PaymentGateway for DarajaClient {
    async fn acquire_access_token(&self) -> Result<AccessToken> {
        let url = format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.base_url
        );

        let response = self
            .token_client
            .get(&url)
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .send()
            .await
            .map_err(|e| AppError::unavailable(format!("Access token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::unavailable(format!("Failed to read access token response: {}", e)))?;

        if !status.is_success() {
            let message = parse_body::<DarajaErrorBody>(&body)
                .and_then(|e| e.error_message)
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(AppError::auth(format!("Failed to generate access token: {}", message)));
        }

        let token: TokenResponse = parse_body(&body)
            .ok_or_else(|| AppError::auth("Malformed access token response"))?;

        if token.access_token.trim().is_empty() {
            return Err(AppError::auth("Empty access token"));
        }

        let expires_in = token
            .expires_in
            .and_then(|secs| secs.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);

        tracing::debug!(expires_in_secs = expires_in.as_secs(), "Daraja access token acquired");

        Ok(AccessToken {
            value: token.access_token,
            expires_in,
        })
    }

    async fn initiate_push(&self, request: &PushRequest) -> Result<PushAcknowledgement> {
        let amount = to_gateway_units(request.amount)?;
        let (password, timestamp) = self.password();

        let payload = StkPushPayload {
            business_short_code: &self.shortcode,
            password,
            timestamp: &timestamp,
            transaction_type: TRANSACTION_TYPE,
            amount,
            party_a: &request.payer_reference,
            party_b: &self.shortcode,
            phone_number: &request.payer_reference,
            callback_url: &self.callback_url,
            account_reference: &request.account_reference,
            transaction_desc: &request.description,
        };

        tracing::info!(
            phone = %mask_msisdn(&request.payer_reference),
            amount = amount,
            account_reference = %request.account_reference,
            "Sending STK push"
        );

        let (status, body) = self
            .post_json("/mpesa/stkpush/v1/processrequest", &payload)
            .await?;

        if !status.is_success() {
            return match parse_body::<DarajaErrorBody>(&body) {
                Some(DarajaErrorBody {
                    error_message: Some(message),
                    error_code,
                    ..
                }) => Err(AppError::rejected(message, error_code)),
                _ if status.is_server_error() => Err(AppError::unavailable(format!(
                    "STK push failed with HTTP {}",
                    status
                ))),
                _ => Err(AppError::rejected(format!("STK push failed with HTTP {}", status), None)),
            };
        }

        let ack: StkPushResponse = parse_body(&body)
            .ok_or_else(|| AppError::unavailable("Malformed STK push response"))?;

        let description = ack
            .response_description
            .clone()
            .unwrap_or_else(|| "STK push failed".to_string());

        if ack.response_code.as_deref() != Some("0") {
            return Err(AppError::rejected(description, ack.response_code));
        }

        let correlation_id = ack
            .checkout_request_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::rejected("Gateway did not return a CheckoutRequestID", None))?;

        Ok(PushAcknowledgement {
            correlation_id,
            merchant_request_id: ack.merchant_request_id.unwrap_or_default(),
            response_description: description,
            customer_message: ack.customer_message,
        })
    }

    async fn query_status(&self, correlation_id: &str) -> Result<PaymentResult> {
        let (password, timestamp) = self.password();
        let payload = StkQueryPayload {
            business_short_code: &self.shortcode,
            password,
            timestamp: &timestamp,
            checkout_request_id: correlation_id,
        };

        let (status, body) = self
            .post_json("/mpesa/stkpushquery/v1/query", &payload)
            .await?;

        if !status.is_success() {
            return match parse_body::<DarajaErrorBody>(&body) {
                Some(err) if err.error_code.as_deref() == Some(STILL_PROCESSING_ERROR_CODE) => {
                    Err(AppError::StillProcessing)
                }
                Some(DarajaErrorBody {
                    error_message: Some(message),
                    ..
                }) => Err(AppError::QueryFailed(message)),
                _ if status.is_server_error() => Err(AppError::unavailable(format!(
                    "STK query failed with HTTP {}",
                    status
                ))),
                _ => Err(AppError::QueryFailed(format!("STK query failed with HTTP {}", status))),
            };
        }

        let raw: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| AppError::QueryFailed(format!("Malformed STK query response: {}", e)))?;
        let response: StkQueryResponse = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::QueryFailed(format!("Malformed STK query response: {}", e)))?;

        if response.response_code.as_deref() != Some("0") {
            return Err(AppError::QueryFailed(
                response
                    .response_description
                    .unwrap_or_else(|| "STK query failed".to_string()),
            ));
        }

        let result_code = response
            .result_code
            .ok_or_else(|| AppError::QueryFailed("STK query response has no ResultCode".to_string()))?;

        Ok(PaymentResult::from_gateway(
            correlation_id,
            result_code,
            response.result_desc.unwrap_or_default(),
            ResultSource::Poll,
            raw,
        )
        .with_merchant_request_id(response.merchant_request_id))
    }

    fn name(&self) -> &str {
        "daraja"
    }
}
