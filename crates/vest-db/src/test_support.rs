//! Shared fixtures for the repository tests.

pub(crate) mod helpers {
    use chrono::NaiveDate;
    use vest_core::entities::{Index, Investment, User};
    use vest_core::enums::{IdDocumentType, PaymentMethod, RiskLevel, Role};

    use crate::repos::index::NewIndex;
    use crate::repos::kyc::NewKycSubmission;
    use crate::repos::payment::NewPaymentRequest;
    use crate::repos::user::NewUser;
    use crate::service::VestService;

    pub const TEST_PASSWORD_HASH: &str = "test-hash";

    pub async fn test_service() -> VestService {
        VestService::new_local(":memory:").await.unwrap()
    }

    async fn create_with_role(svc: &VestService, name: &str, email: &str, role: Role) -> User {
        svc.create_user(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            password_hash: TEST_PASSWORD_HASH.to_string(),
            role,
        })
        .await
        .unwrap()
    }

    pub async fn create_investor(svc: &VestService, email: &str) -> User {
        let name = email.split('@').next().unwrap_or(email);
        create_with_role(svc, name, email, Role::User).await
    }

    pub async fn create_admin(svc: &VestService) -> User {
        create_with_role(svc, "Admin", "admin@vest.local", Role::Admin).await
    }

    pub fn kyc_form() -> NewKycSubmission {
        NewKycSubmission {
            full_name: "Ada Chioma Obi".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            address: "12 Marina Road, Lagos".into(),
            country: "NG".into(),
            id_type: IdDocumentType::Passport,
            id_number: "A01234567".into(),
            document_path: Some("kyc/document.png".into()),
            selfie_path: None,
        }
    }

    pub async fn create_test_index(
        svc: &VestService,
        admin_id: &str,
        name: &str,
        min_investment_cents: i64,
    ) -> Index {
        svc.create_index(
            admin_id,
            NewIndex {
                name: name.to_string(),
                description: None,
                risk_level: RiskLevel::Medium,
                min_investment_cents,
                target_weekly_rate_bps: 150,
            },
        )
        .await
        .unwrap()
    }

    /// An investor whose KYC has been submitted and approved.
    pub async fn verified_investor(svc: &VestService, admin_id: &str, email: &str) -> User {
        let user = create_investor(svc, email).await;
        let kyc = svc.submit_kyc(&user.id, kyc_form()).await.unwrap();
        svc.approve_kyc(admin_id, &kyc.id).await.unwrap();
        svc.get_user(&user.id).await.unwrap()
    }

    /// Open an investment the way production does: payment request, then approval.
    pub async fn fund(
        svc: &VestService,
        admin_id: &str,
        user_id: &str,
        index_id: &str,
        amount_cents: i64,
    ) -> Investment {
        let payment = svc
            .create_payment_request(
                user_id,
                NewPaymentRequest {
                    index_id: index_id.to_string(),
                    amount_cents,
                    method: PaymentMethod::BankTransfer,
                    reference: None,
                },
            )
            .await
            .unwrap();
        let approved = svc.approve_payment(admin_id, &payment.id).await.unwrap();
        svc.get_investment(&approved.investment_id.unwrap())
            .await
            .unwrap()
    }
}
