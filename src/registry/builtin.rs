//! The built-in document types, registered explicitly at startup.
//!
//! One registration call per supported type — growing the closed set means
//! adding a descriptor here, nothing else. Field descriptions are injected
//! into the compiled output schema to steer extraction.

use super::{DocumentTypeDescriptor, DocumentTypeRegistry, FieldKind, FieldSpec, RegistryError};

fn text(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldKind::Text)
}

fn number(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldKind::Number)
}

fn text_list(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldKind::TextList)
}

fn birth_certificate() -> DocumentTypeDescriptor {
    DocumentTypeDescriptor::new("BirthCertificate")
        .field(text("full_name"))
        .field(text("date_of_birth"))
        .field(text("place_of_birth"))
        .field(text("father_name"))
        .field(text("mother_name"))
        .field(text("nationality"))
        .field(text("registration_number"))
        .field(text("date_of_issue"))
        .field(text("issuing_authority"))
}

/// Fallback shape for documents that carry official metadata but match no
/// specific type.
fn general_document() -> DocumentTypeDescriptor {
    DocumentTypeDescriptor::new("GeneralDocument")
        .field(text("issuing_country"))
        .field(text("document_title"))
        .field(text("document_number"))
        .field(text("date_of_issue"))
        .field(text("date_of_expiry"))
        .field(text("relevant_details").describe(
            "Short summary of any other relevant information found in the document",
        ))
}

fn id_card() -> DocumentTypeDescriptor {
    DocumentTypeDescriptor::new("IDCard")
        .field(text("issuing_country"))
        .field(text("id_number"))
        .field(text("full_name"))
        .field(text("date_of_birth"))
        .field(text("nationality"))
        .field(text("date_of_issue"))
        .field(text("date_of_expiry"))
        .field(text("place_of_issue"))
        .field(text("sex"))
        .field(text("machine_readable_zone").describe("MRZ if available"))
}

fn passport() -> DocumentTypeDescriptor {
    DocumentTypeDescriptor::new("Passport")
        .field(text("issuing_country"))
        .field(text("passport_number"))
        .field(text("surname"))
        .field(text("given_names"))
        .field(text("nationality"))
        .field(text("date_of_birth"))
        .field(text("date_of_issue"))
        .field(text("date_of_expiry"))
        .field(text("place_of_issue"))
        .field(text("sex"))
        .field(text("machine_readable_zone").describe("MRZ if available"))
}

fn receipt() -> DocumentTypeDescriptor {
    DocumentTypeDescriptor::new("Receipt")
        .field(text("receipt_number").describe("Unique identifier for the receipt"))
        .field(text("store_name").describe("Name of the store or merchant"))
        .field(text("store_address").describe("Physical or online address of the store"))
        .field(text("store_phone").describe("Contact number of the store"))
        .field(text("date_of_purchase").describe("Date and time of the transaction"))
        .field(text_list("items").required().describe(
            "List of purchased items, one entry per line item formatted as \
             'name | quantity | unit price | line total'",
        ))
        .field(
            number("subtotal")
                .required()
                .describe("Subtotal amount before taxes or discounts"),
        )
        .field(number("tax").describe("Total tax applied to the purchase"))
        .field(number("discount").describe("Total discount applied to the purchase"))
        .field(
            number("total_amount")
                .required()
                .describe("Final total amount after applying tax and discount"),
        )
        .field(text("payment_method").describe("Payment method used (cash, credit card, etc.)"))
        .field(text("transaction_id").describe("Unique transaction ID for the payment"))
        .field(text("cashier_name").describe("Name of the cashier handling the transaction"))
}

fn cv() -> DocumentTypeDescriptor {
    DocumentTypeDescriptor::new("CV")
        .field(text("full_name").describe("Full name of the individual"))
        .field(text("date_of_birth").describe("Date of birth (YYYY-MM-DD format)"))
        .field(text("nationality").describe("Nationality of the individual"))
        .field(text("email").describe("Email address of the individual"))
        .field(text("mobile_number").describe("Mobile number of the individual"))
        .field(text("address").describe("Address of the individual"))
        .field(text("linkedin_profile").describe("LinkedIn profile URL"))
        .field(text("github_profile").describe("GitHub profile URL"))
        .field(text_list("education").describe("List of educational qualifications"))
        .field(text_list("work_experience").describe("List of work experiences"))
        .field(text_list("skills").describe("List of skills and competencies"))
        .field(text_list("certifications").describe("List of certifications or courses"))
        .field(text_list("languages").describe("Languages known by the individual"))
        .field(text("summary").describe("A brief summary or objective statement"))
}

/// Build the registry of all supported document types.
pub fn builtin_registry() -> Result<DocumentTypeRegistry, RegistryError> {
    let mut registry = DocumentTypeRegistry::new();
    registry.register(birth_certificate())?;
    registry.register(general_document())?;
    registry.register(id_card())?;
    registry.register(passport())?;
    registry.register(receipt())?;
    registry.register(cv())?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_six_types() {
        let reg = builtin_registry().unwrap();
        assert_eq!(
            reg.type_names(),
            vec![
                "BirthCertificate",
                "GeneralDocument",
                "IDCard",
                "Passport",
                "Receipt",
                "CV"
            ]
        );
    }

    #[test]
    fn receipt_totals_are_numbers() {
        let reg = builtin_registry().unwrap();
        let receipt = &reg.lookup("Receipt").unwrap().descriptor;

        let total = receipt
            .fields
            .iter()
            .find(|f| f.name == "total_amount")
            .unwrap();
        assert_eq!(total.kind, FieldKind::Number);
        assert!(total.required);

        let items = receipt.fields.iter().find(|f| f.name == "items").unwrap();
        assert_eq!(items.kind, FieldKind::TextList);
    }

    #[test]
    fn cv_lists_are_text_lists() {
        let reg = builtin_registry().unwrap();
        let cv = &reg.lookup("CV").unwrap().descriptor;
        for name in ["education", "work_experience", "skills", "certifications", "languages"] {
            let f = cv.fields.iter().find(|f| f.name == name).unwrap();
            assert_eq!(f.kind, FieldKind::TextList, "{name}");
        }
    }

    #[test]
    fn every_builtin_type_has_a_compiled_schema() {
        let reg = builtin_registry().unwrap();
        for name in reg.type_names() {
            let entry = reg.lookup(name).unwrap();
            assert_eq!(entry.output_schema["properties"]["type"]["const"], name);
        }
    }
}
