//! Rule validation
//!
//! Checks a proposed rule before it is written. Checks run in a fixed order and
//! the first failure wins:
//!
//! 1. structural input checks (lengths, positive application id)
//! 2. name uniqueness (exact comparison)
//! 3. match shape: `DEFAULT` clears key/method/rule, keyed matches need all three
//! 4. `REGEX` match rules must compile
//! 5. the (application id, version) pair names an existing instance
//!
//! Step 3 rewrites the input in place. Nothing is written to the store.

use tracing::debug;
use validator::Validate;

use crate::domain::{MatchMethod, RuleInput};
use crate::errors::{GatewayError, Result};
use crate::storage::RuleTransaction;

/// Validate `input` against the store, normalising its match fields.
pub async fn validate_rule(input: &mut RuleInput, tx: &mut dyn RuleTransaction) -> Result<()> {
    input.validate()?;

    if tx.find_rule_by_name(&input.name).await?.is_some() {
        return Err(GatewayError::duplicate_name(&input.name));
    }

    normalize_match_fields(input)?;

    if tx.find_instance(input.application_id, &input.version).await?.is_none() {
        return Err(GatewayError::version_not_found(input.application_id.get(), &input.version));
    }

    debug!(rule_name = %input.name, match_object = %input.match_object, "Rule passed validation");
    Ok(())
}

/// Store-independent match-shape checks.
///
/// Clears the match fields of a `DEFAULT` rule; otherwise requires all three and
/// compiles `REGEX` rules.
pub fn normalize_match_fields(input: &mut RuleInput) -> Result<()> {
    if input.match_object.is_default() {
        input.match_fields.clear();
        return Ok(());
    }

    let missing = input.match_fields.missing();
    if missing.any() {
        return Err(GatewayError::MissingMatchFields { name: input.name.clone(), missing });
    }

    if input.match_fields.method == Some(MatchMethod::Regex) {
        let pattern = input.match_fields.rule().unwrap_or_default();
        if let Err(e) = regex::Regex::new(pattern) {
            return Err(GatewayError::InvalidMatchRule {
                name: input.name.clone(),
                message: e.to_string(),
            });
        }
    }

    Ok(())
}
