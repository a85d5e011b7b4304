//! Match verification: how likely a found item is the claimant's lost item

use lazy_static::lazy_static;

use crate::flows::Flow;
use crate::models::{VerificationRequest, VerificationResult};
use crate::prompts::PromptTemplate;
use crate::schema::{FieldKind, FieldShape, ShapeDeclaration};

lazy_static! {
    static ref INPUT: ShapeDeclaration = ShapeDeclaration::new(
        "VerificationRequest",
        vec![
            FieldShape::required("lostItemDescription", FieldKind::Text, "The description of the lost item."),
            FieldShape::required("foundItemDescription", FieldKind::Text, "The description of the found item."),
            FieldShape::required(
                "lostItemPhotoDataUri",
                FieldKind::Media,
                "A photo of the lost item as a base64 data URI.",
            ),
            FieldShape::required(
                "foundItemPhotoDataUri",
                FieldKind::Media,
                "A photo of the found item as a base64 data URI.",
            ),
        ],
    );
    static ref OUTPUT: ShapeDeclaration = ShapeDeclaration::new(
        "VerificationResult",
        vec![
            FieldShape::required(
                "matchScore",
                FieldKind::UnitInterval,
                "A score between 0 and 1 indicating how well the lost and found items match. Higher is a stronger match.",
            ),
            FieldShape::required(
                "reason",
                FieldKind::Text,
                "A brief explanation of why the items were judged a good or bad match.",
            ),
        ],
    );
}

static TEMPLATE: PromptTemplate = PromptTemplate::new(
    "verifyItemMatch",
    r#"You judge whether a found item is the same physical object as an item someone reported lost, using both descriptions and both photos.

Give matchScore between 0 and 1: 1 means certainly the same item, 0 means certainly different. In reason, briefly explain the score.

Lost item description: {{{lostItemDescription}}}
Found item description: {{{foundItemDescription}}}

Lost item photo: {{media url=lostItemPhotoDataUri}}
Found item photo: {{media url=foundItemPhotoDataUri}}"#,
);

pub struct MatchVerificationFlow;

impl Flow for MatchVerificationFlow {
    type Input = VerificationRequest;
    type Output = VerificationResult;

    const NAME: &'static str = "verifyItemMatch";

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
