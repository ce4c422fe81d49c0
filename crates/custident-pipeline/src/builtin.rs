//! Operations served by the customer-identity reference-data proxy.

use custident_transform::{
    FailurePolicy, Selector, StatusCodeSource, STATUS_FAIL, STATUS_FAILED,
    STATUS_INVALID_RESPONSE_FORMAT,
};

use crate::operation::OperationConfig;

pub const EXECUTE_ONBOARDING_PARTY: &str = "executeOnboardingParty";
pub const RETRIEVE_CUSTOMER_CARD: &str = "retrieveCustomerCard";
pub const RETRIEVE_CUSTOMER: &str = "retrieveCustomer";
pub const RETRIEVE_PAYMENT_BALANCES_FACILITY: &str = "retrievePaymentBalancesFacility";
pub const REGISTER_CUSTOMER_LOCATION_REFERENCE: &str = "registerCustomerLocationReference";
pub const CLEAN_REQUEST: &str = "cleanRequest";

/// Every built-in operation, in catalog order.
pub fn operations() -> Vec<OperationConfig> {
    vec![
        execute_onboarding_party(),
        retrieve_customer_card(),
        retrieve_customer(),
        retrieve_payment_balances_facility(),
        register_customer_location_reference(),
        clean_request(),
    ]
}

pub fn execute_onboarding_party() -> OperationConfig {
    OperationConfig::new(EXECUTE_ONBOARDING_PARTY)
        .with_request(Selector::new().field("sessionDialogueIdentification"))
        .with_response(
            Selector::new().object("partyReference", Selector::new().field("referenceId")),
        )
        .with_failure(FailurePolicy::with_fallback(STATUS_FAIL))
}

pub fn retrieve_customer_card() -> OperationConfig {
    OperationConfig::new(RETRIEVE_CUSTOMER_CARD)
        .with_request(
            Selector::new()
                .field("companyReference")
                .each("accountIdentification", account_identification()),
        )
        .with_response(
            Selector::new()
                .object(
                    "partyReference",
                    Selector::new()
                        .object(
                            "personName",
                            person_name(&["familyName", "secondLastName", "firstName", "secondName"]),
                        )
                        .each("identifications", identification())
                        .field("referenceId"),
                )
                .object("paymentCard", Selector::new().field("cardNumber")),
        )
        .with_failure(
            FailurePolicy::with_fallback(STATUS_FAILED)
                .status_code_from(StatusCodeSource::BodyThenTransport),
        )
}

pub fn retrieve_customer() -> OperationConfig {
    OperationConfig::new(RETRIEVE_CUSTOMER)
        .with_request(
            Selector::new()
                .fields(&["companyReference", "option"])
                .object(
                    "partyReference",
                    Selector::new()
                        .object(
                            "personName",
                            person_name(&[
                                "familyName",
                                "secondLastName",
                                "firstName",
                                "secondName",
                                "marriedName",
                                "fullName",
                            ]),
                        )
                        .each("identifications", identification())
                        .field("dateOfBirth")
                        .each(
                            "contactPoint",
                            Selector::new().fields(&["contactPointValue", "contactPointType"]),
                        )
                        .field("referenceId"),
                )
                .object("paymentCard", Selector::new().field("cardNumber"))
                .each("accountIdentification", account_identification()),
        )
        .with_response(
            Selector::new().object(
                "partyReference",
                Selector::new()
                    .object(
                        "personName",
                        person_name(&[
                            "familyName",
                            "secondLastName",
                            "firstName",
                            "secondName",
                            "fullName",
                        ]),
                    )
                    .each("identifications", identification())
                    .field("dateOfBirth")
                    .field("referenceId"),
            ),
        )
        .with_failure(FailurePolicy::with_fallback(STATUS_INVALID_RESPONSE_FORMAT))
}

pub fn retrieve_payment_balances_facility() -> OperationConfig {
    OperationConfig::new(RETRIEVE_PAYMENT_BALANCES_FACILITY)
        .with_request(Selector::new().object(
            "paymentBalancesFacility",
            Selector::new().fields(&["companyReference", "branch", "user", "financialTransaction"]),
        ))
        .with_response(Selector::new().object(
            "paymentBalancesFacility",
            Selector::new().fields(&[
                "serviceAmount",
                "currency",
                "serviceAmountCharge",
                "descriptionAmountService",
                "descriptionAmountChargeService",
                "description",
            ]),
        ))
        .with_failure(FailurePolicy::with_fallback(STATUS_INVALID_RESPONSE_FORMAT))
}

pub fn register_customer_location_reference() -> OperationConfig {
    let location = Selector::new()
        .fields(&["locationAddressType", "locationInegiCode"])
        .object("street", Selector::new().fields(&["streetNumber", "streetName"]))
        .fields(&[
            "neighborhood",
            "locationDescription",
            "locationReferencePoint",
            "locationObservations",
            "neighborhoodNumber",
            "cityNumber",
        ])
        .object("country", Selector::new().field("code"))
        .object(
            "countyDistrict",
            Selector::new().fields(&["code", "name", "inegiCode"]),
        )
        .field("postalCode")
        .object("city", Selector::new().field("code"))
        .object("province", Selector::new().fields(&["name", "code"]))
        .object("state", Selector::new().fields(&["code", "inegiCode"]))
        .fields(&[
            "externalHouseNumber",
            "internalHouseNumber",
            "houseNumber",
            "cardinalPoint",
            "sector",
            "block",
            "stage",
            "lot",
            "building",
            "entryPoint",
            "isHousingUnit",
        ]);

    let party_reference = Selector::new()
        .fields(&["referenceId", "referenceIdCoppel"])
        .each(
            "contactPoint",
            Selector::new().fields(&[
                "contactPointType",
                "contactPointValue",
                "contactPointDetail",
                "contactPointStatus",
            ]),
        );

    OperationConfig::new(REGISTER_CUSTOMER_LOCATION_REFERENCE)
        .with_request(Selector::new().object(
            "customerLocationReference",
            Selector::new()
                .each("location", location)
                .object("partyReference", party_reference)
                .fields(&[
                    "sequence",
                    "user",
                    "dateInsert",
                    "companyReference",
                    "option",
                    "operationType",
                ]),
        ))
        .with_failure(FailurePolicy::with_fallback(STATUS_INVALID_RESPONSE_FORMAT))
}

/// Forwards the request unchanged, including the `sessionId` header.
pub fn clean_request() -> OperationConfig {
    OperationConfig::new(CLEAN_REQUEST)
}

fn person_name(fields: &[&str]) -> Selector {
    Selector::new().fields(fields)
}

fn identification() -> Selector {
    Selector::new()
        .object("identifier", Selector::new().field("identifierValue"))
        .field("personIdentificationType")
}

fn account_identification() -> Selector {
    Selector::new().fields(&["identifierValue", "accountIdentificationType"])
}
