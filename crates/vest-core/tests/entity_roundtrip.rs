//! Serde roundtrip and JsonSchema validation tests for entity and response types.

use chrono::{NaiveDate, Utc};
use schemars::schema_for;
use vest_core::audit_detail::{DistributedDetail, StatusChangedDetail};
use vest_core::entities::*;
use vest_core::enums::*;
use vest_core::period::Period;
use vest_core::responses::*;

/// Validate a JSON value against a schemars-generated schema.
fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

macro_rules! roundtrip_and_validate {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;

            let json_str = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json_str).unwrap();
            assert_eq!(
                recovered,
                val,
                "serde roundtrip failed for {}",
                stringify!($ty)
            );

            let schema = serde_json::to_value(schema_for!($ty)).unwrap();
            let instance = serde_json::to_value(&val).unwrap();
            let errors = validate_against_schema(&schema, &instance);
            assert!(
                errors.is_empty(),
                "Schema validation failed for {}: {:?}",
                stringify!($ty),
                errors
            );
        }
    };
}

fn period() -> Period {
    "2026-W42".parse().unwrap()
}

fn user() -> User {
    User {
        id: "usr-a3f8b2c1".into(),
        name: "Ada Obi".into(),
        email: "ada@example.com".into(),
        phone: Some("+2348000000000".into()),
        role: Role::User,
        kyc_status: KycStatus::Approved,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn investment() -> Investment {
    Investment {
        id: "inv-0b1c2d3e".into(),
        user_id: "usr-a3f8b2c1".into(),
        index_id: "idx-5e6f7a8b".into(),
        payment_id: Some("pay-11223344".into()),
        amount_cents: 500_000,
        total_returns_cents: 12_500,
        status: InvestmentStatus::Active,
        created_at: Utc::now(),
        closed_at: None,
    }
}

fn return_entry() -> ReturnEntry {
    ReturnEntry {
        id: "ret-9a8b7c6d".into(),
        investment_id: "inv-0b1c2d3e".into(),
        distribution_id: "dst-1a2b3c4d".into(),
        period: period(),
        rate_bps: 250,
        amount_cents: 12_500,
        created_at: Utc::now(),
    }
}

fn distribution() -> Distribution {
    Distribution {
        id: "dst-1a2b3c4d".into(),
        index_id: "idx-5e6f7a8b".into(),
        period: period(),
        rate_bps: 250,
        investment_count: 1,
        total_amount_cents: 12_500,
        distributed_by: "usr-admin001".into(),
        created_at: Utc::now(),
    }
}

roundtrip_and_validate!(user_roundtrip, User, user());

roundtrip_and_validate!(
    kyc_roundtrip,
    KycSubmission,
    KycSubmission {
        id: "kyc-c4e2d1f0".into(),
        user_id: "usr-a3f8b2c1".into(),
        full_name: "Ada Chioma Obi".into(),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
        address: "12 Marina Road, Lagos".into(),
        country: "NG".into(),
        id_type: IdDocumentType::Passport,
        id_number: "A01234567".into(),
        document_path: Some("kyc/usr-a3f8b2c1-document-1a2b.png".into()),
        selfie_path: None,
        status: ReviewStatus::Rejected,
        rejection_reason: Some("Document is blurry".into()),
        reviewed_by: Some("usr-admin001".into()),
        submitted_at: Utc::now(),
        reviewed_at: Some(Utc::now()),
    }
);

roundtrip_and_validate!(
    index_roundtrip,
    Index,
    Index {
        id: "idx-5e6f7a8b".into(),
        name: "Tech Growth".into(),
        slug: "tech-growth".into(),
        description: Some("Large-cap technology basket".into()),
        risk_level: RiskLevel::High,
        min_investment_cents: 10_000,
        target_weekly_rate_bps: 300,
        last_rate_bps: Some(250),
        last_distributed_at: Some(Utc::now()),
        status: IndexStatus::Active,
        total_invested_cents: 500_000,
        investor_count: 1,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    payment_roundtrip,
    PaymentRequest,
    PaymentRequest {
        id: "pay-11223344".into(),
        user_id: "usr-a3f8b2c1".into(),
        index_id: "idx-5e6f7a8b".into(),
        amount_cents: 500_000,
        method: PaymentMethod::BankTransfer,
        reference: Some("TRX-88412".into()),
        proof_path: None,
        status: ReviewStatus::Approved,
        rejection_reason: None,
        reviewed_by: Some("usr-admin001".into()),
        investment_id: Some("inv-0b1c2d3e".into()),
        created_at: Utc::now(),
        reviewed_at: Some(Utc::now()),
    }
);

roundtrip_and_validate!(investment_roundtrip, Investment, investment());
roundtrip_and_validate!(return_entry_roundtrip, ReturnEntry, return_entry());
roundtrip_and_validate!(distribution_roundtrip, Distribution, distribution());

roundtrip_and_validate!(
    withdrawal_roundtrip,
    Withdrawal,
    Withdrawal {
        id: "wdr-55667788".into(),
        user_id: "usr-a3f8b2c1".into(),
        amount_cents: 5_000,
        method: PaymentMethod::MobileMoney,
        destination: "+2348000000000".into(),
        status: WithdrawalStatus::Paid,
        rejection_reason: None,
        reviewed_by: Some("usr-admin001".into()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        paid_at: Some(Utc::now()),
    }
);

roundtrip_and_validate!(
    audit_roundtrip,
    AuditEntry,
    AuditEntry {
        id: "aud-deadbeef".into(),
        actor_id: Some("usr-admin001".into()),
        entity_type: EntityType::Distribution,
        entity_id: "dst-1a2b3c4d".into(),
        action: AuditAction::Distributed,
        detail: Some(
            serde_json::to_value(DistributedDetail {
                distribution_id: "dst-1a2b3c4d".into(),
                period: "2026-W42".into(),
                rate_bps: 250,
                investment_count: 1,
                total_amount_cents: 12_500,
            })
            .unwrap()
        ),
        created_at: Utc::now(),
    }
);

roundtrip_and_validate!(
    status_changed_detail_roundtrip,
    StatusChangedDetail,
    StatusChangedDetail {
        from: "pending".into(),
        to: "rejected".into(),
        reason: Some("Reference not found on statement".into()),
    }
);

roundtrip_and_validate!(
    page_roundtrip,
    Page<Investment>,
    Page::new(vec![investment()], 1, 20, 1)
);

roundtrip_and_validate!(
    portfolio_roundtrip,
    PortfolioSummary,
    PortfolioSummary {
        balance: Balance::new(500_000, 12_500, 5_000),
        active_investments: 1,
        pending_payments: 0,
        pending_withdrawals: 1,
        recent_returns: vec![return_entry()],
    }
);

roundtrip_and_validate!(
    investment_detail_roundtrip,
    InvestmentDetail,
    InvestmentDetail {
        investment: investment(),
        index_name: "Tech Growth".into(),
        returns: vec![return_entry()],
    }
);

roundtrip_and_validate!(
    distribution_report_roundtrip,
    DistributionReport,
    DistributionReport {
        distribution: distribution(),
        index_name: "Tech Growth".into(),
        credits: vec![ReturnCredit {
            investment_id: "inv-0b1c2d3e".into(),
            user_id: "usr-a3f8b2c1".into(),
            amount_cents: 12_500,
            total_returns_cents: 12_500,
        }],
    }
);

roundtrip_and_validate!(
    auth_response_roundtrip,
    AuthResponse,
    AuthResponse {
        token: "header.payload.signature".into(),
        expires_at: Utc::now(),
        user: user(),
    }
);

#[test]
fn period_schema_rejects_bad_format() {
    let schema = serde_json::to_value(schema_for!(Period)).unwrap();
    let errors = validate_against_schema(&schema, &serde_json::json!("2026-42"));
    assert!(!errors.is_empty());
}
