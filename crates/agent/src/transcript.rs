use std::sync::Arc;

use checkcall_core::{DegradedReason, Sourced, StructuredCallData};
use tracing::warn;

use crate::llm::{ChatMessage, ChatRequest, LlmClient};

const EXTRACTION_MAX_TOKENS: u32 = 200;
const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// Post-call analysis: transcript text in, structured outcome record out.
pub struct TranscriptProcessor {
    llm: Option<Arc<dyn LlmClient>>,
}

impl TranscriptProcessor {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }

    pub fn is_live(&self) -> bool {
        self.llm.is_some()
    }

    /// Never fails. Without a configured model the canned test record is
    /// returned; a failed request or an unusable completion degrades to
    /// the processing-error record.
    pub async fn process(
        &self,
        transcript: &str,
        driver_name: &str,
        load_number: &str,
    ) -> Sourced<StructuredCallData> {
        let Some(llm) = &self.llm else {
            return Sourced::degraded(
                StructuredCallData::test_mode(),
                DegradedReason::MissingCredentials,
            );
        };

        let chat = ChatRequest {
            messages: vec![
                ChatMessage::system(extraction_prompt(driver_name, load_number)),
                ChatMessage::user(transcript),
            ],
            max_tokens: EXTRACTION_MAX_TOKENS,
            temperature: EXTRACTION_TEMPERATURE,
        };

        let completion = match llm.chat(chat).await {
            Ok(completion) => completion,
            Err(err) => {
                warn!(
                    event_name = "transcript.extraction.request_failed",
                    error = %err,
                    "extraction request failed, storing processing-error record"
                );
                return Sourced::degraded(
                    StructuredCallData::processing_error(),
                    DegradedReason::RequestFailed(err.to_string()),
                );
            }
        };

        // Deserialization through the closed field vocabularies is the
        // validation step: the model is not contractually bound to the
        // instructed values.
        match serde_json::from_str::<StructuredCallData>(completion.trim()) {
            Ok(structured) => Sourced::Live(structured),
            Err(err) => {
                warn!(
                    event_name = "transcript.extraction.unparseable",
                    error = %err,
                    "extraction output was not a known shape, storing processing-error record"
                );
                Sourced::degraded(
                    StructuredCallData::processing_error(),
                    DegradedReason::MalformedResponse(err.to_string()),
                )
            }
        }
    }
}

fn extraction_prompt(driver_name: &str, load_number: &str) -> String {
    format!(
        "You are a call analysis system. Extract structured data from the following call \
         transcript between a dispatch agent and truck driver {driver_name} regarding load \
         {load_number}.\n\n\
         RETURN ONLY valid JSON in this exact format based on the call content:\n\n\
         For regular check-in calls:\n\
         {{\n\
             \"call_outcome\": \"In-Transit Update\" OR \"Arrival Confirmation\" OR \"Unable to Reach\" OR \"Incomplete\",\n\
             \"driver_status\": \"Driving\" OR \"Delayed\" OR \"Arrived\" OR \"Unknown\",\n\
             \"current_location\": \"specific location mentioned or null\",\n\
             \"eta\": \"estimated time mentioned or null\"\n\
         }}\n\n\
         For emergency calls:\n\
         {{\n\
             \"call_outcome\": \"Emergency Detected\",\n\
             \"emergency_type\": \"Accident\" OR \"Breakdown\" OR \"Medical\" OR \"Other\",\n\
             \"emergency_location\": \"specific location mentioned or null\",\n\
             \"escalation_status\": \"Escalation Flagged\"\n\
         }}\n\n\
         If the call was incomplete or the driver was unresponsive:\n\
         {{\n\
             \"call_outcome\": \"Unable to Reach\" OR \"Incomplete\",\n\
             \"driver_status\": \"Unresponsive\" OR \"Unavailable\",\n\
             \"current_location\": null,\n\
             \"eta\": null\n\
         }}\n\n\
         Analyze the following transcript and return ONLY the JSON:"
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use checkcall_core::{
        CallOutcome, DegradedReason, DriverStatus, EmergencyType, StructuredCallData,
    };

    use super::TranscriptProcessor;
    use crate::llm::{ChatRequest, LlmClient, LlmError};

    struct ScriptedClient(String);

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn chat(&self, _request: ChatRequest) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn chat(&self, _request: ChatRequest) -> Result<String, LlmError> {
            Err(LlmError::Status { status: 502, body: "bad gateway".to_string() })
        }
    }

    fn processor_with(reply: &str) -> TranscriptProcessor {
        TranscriptProcessor::new(Some(Arc::new(ScriptedClient(reply.to_string()))))
    }

    #[tokio::test]
    async fn degraded_mode_returns_test_record() {
        let processor = TranscriptProcessor::new(None);
        let result = processor.process("I'm on I-10, ETA 9am", "Alice", "L100").await;

        assert_eq!(result.reason(), Some(&DegradedReason::MissingCredentials));
        assert_eq!(result.value().outcome(), CallOutcome::TestCompleted);
    }

    #[tokio::test]
    async fn routine_completion_parses_live() {
        let processor = processor_with(
            r#"{
                "call_outcome": "In-Transit Update",
                "driver_status": "Driving",
                "current_location": "I-10 near Phoenix",
                "eta": "9 AM"
            }"#,
        );
        let result = processor.process("I'm on I-10, ETA 9am", "Alice", "L100").await;

        assert!(!result.is_degraded());
        let update = match result.into_value() {
            StructuredCallData::Routine(update) => update,
            other => panic!("expected routine record, got {other:?}"),
        };
        assert_eq!(update.driver_status, DriverStatus::Driving);
        assert_eq!(update.eta.as_deref(), Some("9 AM"));
    }

    #[tokio::test]
    async fn emergency_completion_parses_live() {
        let processor = processor_with(
            r#"{
                "call_outcome": "Emergency Detected",
                "emergency_type": "Accident",
                "emergency_location": "Exit 42, I-10",
                "escalation_status": "Escalation Flagged"
            }"#,
        );
        let result = processor.process("there's been a crash", "Alice", "L100").await;

        assert!(!result.is_degraded());
        let report = match result.into_value() {
            StructuredCallData::Emergency(report) => report,
            other => panic!("expected emergency record, got {other:?}"),
        };
        assert_eq!(report.emergency_type, EmergencyType::Accident);
    }

    #[tokio::test]
    async fn malformed_completion_degrades_to_processing_error() {
        let processor = processor_with("Sure! Here's the summary of the call: ...");
        let result = processor.process("transcript", "Alice", "L100").await;

        assert!(matches!(result.reason(), Some(DegradedReason::MalformedResponse(_))));
        assert_eq!(result.value(), &StructuredCallData::processing_error());
    }

    #[tokio::test]
    async fn out_of_vocabulary_completion_degrades_to_processing_error() {
        let processor = processor_with(
            r#"{
                "call_outcome": "Smooth Sailing",
                "driver_status": "Driving",
                "current_location": null,
                "eta": null
            }"#,
        );
        let result = processor.process("transcript", "Alice", "L100").await;

        assert!(matches!(result.reason(), Some(DegradedReason::MalformedResponse(_))));
        assert_eq!(result.value().outcome(), CallOutcome::ProcessingError);
    }

    #[tokio::test]
    async fn failed_request_degrades_to_processing_error() {
        let processor = TranscriptProcessor::new(Some(Arc::new(FailingClient)));
        let result = processor.process("transcript", "Alice", "L100").await;

        assert!(matches!(result.reason(), Some(DegradedReason::RequestFailed(_))));
        assert_eq!(result.value().outcome(), CallOutcome::ProcessingError);
    }
}
