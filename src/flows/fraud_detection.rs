//! Fraud detection: score a claim for suspicious patterns

use lazy_static::lazy_static;

use crate::flows::Flow;
use crate::models::{FraudCheckRequest, FraudCheckResult};
use crate::prompts::PromptTemplate;
use crate::schema::{FieldKind, FieldShape, ShapeDeclaration};

lazy_static! {
    static ref INPUT: ShapeDeclaration = ShapeDeclaration::new(
        "FraudCheckRequest",
        vec![
            FieldShape::required(
                "claimDetails",
                FieldKind::Text,
                "Details of the claim, including user information, item description, and claim history.",
            ),
            FieldShape::required(
                "userBehavior",
                FieldKind::Text,
                "Information about the user behavior, such as login frequency, reported items, and claim patterns.",
            ),
        ],
    );
    static ref OUTPUT: ShapeDeclaration = ShapeDeclaration::new(
        "FraudCheckResult",
        vec![
            FieldShape::required(
                "isSuspicious",
                FieldKind::Boolean,
                "Whether the claim is considered suspicious based on the analysis.",
            ),
            FieldShape::required(
                "fraudScore",
                FieldKind::UnitInterval,
                "Likelihood of fraud, from 0 to 1.",
            ),
            FieldShape::required(
                "reason",
                FieldKind::Text,
                "Why the claim was classified this way, e.g. inconsistent details or unusual behavior.",
            ),
        ],
    );
}

static TEMPLATE: PromptTemplate = PromptTemplate::new(
    "detectSuspiciousClaims",
    r#"You are a fraud analyst reviewing ownership claims at a lost & found office.

Analyse the claim details and the claimant's behaviour and decide whether the claim is suspicious. Give a fraudScore between 0 and 1 for the likelihood of fraud, set isSuspicious accordingly, and explain the reasoning in reason.

Claim Details: {{{claimDetails}}}
User Behavior: {{{userBehavior}}}"#,
);

pub struct FraudDetectionFlow;

impl Flow for FraudDetectionFlow {
    type Input = FraudCheckRequest;
    type Output = FraudCheckResult;

    const NAME: &'static str = "detectSuspiciousClaims";

    fn input_shape() -> &'static ShapeDeclaration {
        &INPUT
    }

    fn output_shape() -> &'static ShapeDeclaration {
        &OUTPUT
    }

    fn template() -> &'static PromptTemplate {
        &TEMPLATE
    }
}
