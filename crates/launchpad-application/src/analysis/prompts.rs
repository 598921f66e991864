//! Classifier instructions.

use launchpad_core::{FieldCatalogue, PromptMessage};
use minijinja::{Environment, context};

const REQUIREMENTS_TEMPLATE: &str = "requirements";
const RECOVERY_TEMPLATE: &str = "recovery";

const REQUIREMENTS_INSTRUCTIONS: &str = r#"You help a developer publish a new release of their application to an app store.
Decide which store listing fields still need input from the developer.

{{ catalogue }}
Rules:
- Every obligatory field without a collected value must be listed with priority "high".
- List optional fields only when the release context makes them worth asking for.
- Never list a field that appears under "Already collected".
- Put values you can infer from the context into "suggested_values".

Reply with a single JSON object and nothing else:
{"fields": [{"field": "<field key>", "reason": "<why it is needed>", "priority": "high|medium|low", "suggested_values": ["..."]}]}"#;

const RECOVERY_INSTRUCTIONS: &str = r#"A release could not be published to the app store.

Failed step: {{ step }}
Attempt: {{ attempt }}
Store error: {{ error }}

{{ catalogue }}
Identify the fields whose values caused the failure and must be corrected by the developer.
If the error is transient or unrelated to the submitted data, reply with an empty list so the
release is submitted again unchanged.

Reply with a single JSON object and nothing else:
{"fields": [{"field": "<field key>", "issue": "<what is wrong with the current value>", "suggested_values": ["..."]}]}"#;

/// Renders the instruction messages sent to the classifier.
pub struct PromptRenderer {
    env: Environment<'static>,
    catalogue: FieldCatalogue,
}

impl PromptRenderer {
    pub fn new(catalogue: FieldCatalogue) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(REQUIREMENTS_TEMPLATE, REQUIREMENTS_INSTRUCTIONS)?;
        env.add_template(RECOVERY_TEMPLATE, RECOVERY_INSTRUCTIONS)?;
        Ok(Self { env, catalogue })
    }

    /// Messages asking which fields are still required.
    pub fn requirements(&self, session_context: &str) -> Result<Vec<PromptMessage>, minijinja::Error> {
        let instructions = self
            .env
            .get_template(REQUIREMENTS_TEMPLATE)?
            .render(context! { catalogue => self.catalogue.describe() })?;
        Ok(vec![
            PromptMessage::system(instructions),
            PromptMessage::user(session_context),
        ])
    }

    /// Messages asking which fields caused a publish failure.
    pub fn recovery(
        &self,
        session_context: &str,
        step: &str,
        error: &str,
        attempt: u32,
    ) -> Result<Vec<PromptMessage>, minijinja::Error> {
        let instructions = self.env.get_template(RECOVERY_TEMPLATE)?.render(context! {
            catalogue => self.catalogue.describe(),
            step => step,
            error => error,
            attempt => attempt,
        })?;
        Ok(vec![
            PromptMessage::system(instructions),
            PromptMessage::user(session_context),
        ])
    }
}
