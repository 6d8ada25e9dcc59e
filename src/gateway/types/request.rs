//! Request bodies
//!
//! Amounts deserialize straight into [`Money`]: a decimal given as string or
//! number, at most two fractional digits. Anything else is a 400 before the
//! handler runs.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::money::Money;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    #[schema(example = "acc_1001")]
    pub account_id: String,
    /// Opening balance, must not be negative
    #[schema(value_type = String, example = "1000.00")]
    pub initial_balance: Money,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// Source account
    #[schema(example = "acc_1001")]
    pub account_id: String,
    #[schema(example = "acc_1002")]
    pub destination_account_id: String,
    #[schema(value_type = String, example = "200.00")]
    pub amount: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_request_accepts_string_or_number() {
        let req: TransferRequest = serde_json::from_str(
            r#"{"account_id":"A","destination_account_id":"B","amount":"12.50"}"#,
        )
        .unwrap();
        assert_eq!(req.amount, Money::from_minor_units(1250));

        let req: TransferRequest = serde_json::from_str(
            r#"{"account_id":"A","destination_account_id":"B","amount":200}"#,
        )
        .unwrap();
        assert_eq!(req.amount, Money::from_major(200));
    }

    #[test]
    fn test_rejects_excess_precision() {
        let res: Result<CreateAccountRequest, _> =
            serde_json::from_str(r#"{"account_id":"A","initial_balance":"1.001"}"#);
        assert!(res.is_err());
    }
}
