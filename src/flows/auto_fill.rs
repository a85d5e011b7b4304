//! Auto-fill: suggest report form fields from a description and optional photo

use lazy_static::lazy_static;

use crate::flows::Flow;
use crate::models::{AutoFillRequest, AutoFillResult};
use crate::prompts::PromptTemplate;
use crate::schema::{FieldKind, FieldShape, ShapeDeclaration};

lazy_static! {
    static ref INPUT: ShapeDeclaration = ShapeDeclaration::new(
        "AutoFillRequest",
        vec![
            FieldShape::required(
                "description",
                FieldKind::Text,
                "The description of the lost or found item.",
            ),
            FieldShape::optional(
                "photoDataUri",
                FieldKind::Media,
                "A photo of the item as a base64 data URI: 'data:<mimetype>;base64,<encoded_data>'.",
            ),
        ],
    );
    static ref OUTPUT: ShapeDeclaration = ShapeDeclaration::new(
        "AutoFillResult",
        vec![
            FieldShape::required(
                "itemCategory",
                FieldKind::Text,
                "The category of the item (e.g., electronics, clothing, documents).",
            ),
            FieldShape::required("itemColor", FieldKind::Text, "The color of the item."),
            FieldShape::required(
                "itemLocation",
                FieldKind::Text,
                "The last known location of the item.",
            ),
            FieldShape::required(
                "additionalDetails",
                FieldKind::Text,
                "Any other relevant details about the item.",
            ),
        ],
    );
}

static TEMPLATE: PromptTemplate = PromptTemplate::new(
    "autoFillFormDetails",
    r#"You help people report lost or found items. From the user's description and, when one is attached, the photo of the item, fill in these form fields:

- itemCategory: the category of the item (e.g., electronics, clothing, documents)
- itemColor: the color of the item
- itemLocation: the last known location of the item
- additionalDetails: any other relevant details about the item

Use "Unknown" for a field the input says nothing about.

Description: {{{description}}}
{{#if photoDataUri}}Photo: {{media url=photoDataUri}}
{{/if}}
Answer in JSON."#,
);

pub struct AutoFillFlow;

impl Flow for AutoFillFlow {
    type Input = AutoFillRequest;
    type Output = AutoFillResult;

    const NAME: &'static str = "autoFillFormDetails";

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_without_photo() {
        let request = serde_json::to_value(AutoFillRequest {
            description: "A black leather wallet with a scratch".into(),
            photo_data_uri: None,
        })
        .unwrap();

        let prompt = AutoFillFlow::template().render(&request).unwrap();
        let text = prompt.text();
        assert!(text.contains("Description: A black leather wallet with a scratch"));
        assert!(!text.contains("Photo:"));
        assert!(prompt.media().is_empty());
    }

    #[test]
    fn test_prompt_with_photo_embeds_media() {
        let request = serde_json::to_value(AutoFillRequest {
            description: "keys".into(),
            photo_data_uri: Some("data:image/jpeg;base64,/9j/4A==".into()),
        })
        .unwrap();

        let prompt = AutoFillFlow::template().render(&request).unwrap();
        assert_eq!(prompt.media().len(), 1);
        assert_eq!(prompt.media()[0].mime_type, "image/jpeg");
    }

    #[test]
    fn test_output_shape_matches_record() {
        let names: Vec<_> = AutoFillFlow::output_shape().fields.iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec!["itemCategory", "itemColor", "itemLocation", "additionalDetails"]
        );
    }
}
