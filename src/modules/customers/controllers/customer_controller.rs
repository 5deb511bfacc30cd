use std::sync::Arc;

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::error::AppError;
use crate::core::phone::normalize_msisdn;
use crate::modules::customers::models::Customer;
use crate::modules::customers::repositories::CustomerAccounts;

/// Body of `POST /customers`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertCustomerRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub outstanding_balance: Option<Decimal>,
}

impl UpsertCustomerRequest {
    fn into_customer(self) -> Result<Customer, AppError> {
        let code = self.code.map(|c| c.trim().to_string()).unwrap_or_default();
        let name = self.name.map(|n| n.trim().to_string()).unwrap_or_default();
        if code.is_empty() || name.is_empty() {
            return Err(AppError::validation("Customer code and name are required"));
        }

        let balance = self.outstanding_balance.unwrap_or(Decimal::ZERO);
        if balance.is_sign_negative() {
            return Err(AppError::validation("Outstanding balance cannot be negative"));
        }

        let phone = match self.phone.as_deref().map(str::trim) {
            Some(phone) if !phone.is_empty() => Some(normalize_msisdn(phone)?),
            _ => None,
        };

        Ok(Customer::new(code, name, balance).with_phone(phone))
    }
}

/// Create or update a customer by code
/// POST /customers
pub async fn upsert_customer(
    accounts: web::Data<Arc<dyn CustomerAccounts>>,
    request: web::Json<UpsertCustomerRequest>,
) -> Result<HttpResponse, AppError> {
    let customer = request.into_inner().into_customer()?;
    let stored = accounts.upsert(&customer).await?;

    tracing::info!(
        customer_id = %stored.id,
        code = %stored.code,
        outstanding_balance = %stored.outstanding_balance,
        "Customer saved"
    );
    Ok(HttpResponse::Ok().json(stored))
}

/// Customer by code
/// GET /customers/{code}
pub async fn get_customer(
    accounts: web::Data<Arc<dyn CustomerAccounts>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let code = path.into_inner();
    let customer = accounts
        .find_by_code(&code)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Customer {}", code)))?;

    Ok(HttpResponse::Ok().json(customer))
}

/// Configure customer routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/customers")
            .route("", web::post().to(upsert_customer))
            .route("/{code}", web::get().to(get_customer)),
    );
}
