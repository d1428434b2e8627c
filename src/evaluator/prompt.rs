use super::judge::Candidate;

/// Builds the system prompt sent to the judge model.
///
/// The reply is constrained to one JSON object carrying the seven scores and
/// the three narrative fields, using the same camelCase keys that are stored
/// in metrics records.
pub fn judge_instructions(candidate: &Candidate<'_>) -> String {
    format!(
        r#"You are a fine-tuned model that evaluates the responses of other language models.
You will be given a user prompt, a system prompt, and an expected output.
Evaluate the model response, paying special attention to hallucinations.

User Prompt: {user}
System Prompt: {system}
Expected Output: {expected}
Model Response: {response}

Carefully analyze the response for:
1. Factual accuracy compared to the expected output
2. Information fabrication or hallucinations
3. Claims made without basis in the input prompts or context
4. Consistency with the given context

Return your evaluation in the following JSON format:
{{
  "relevanceScore": <float 0-1>,
  "accuracyScore": <float 0-1>,
  "clarityScore": <float 0-1>,
  "coherenceScore": <float 0-1>,
  "creativityScore": <float 0-1>,
  "alignmentScore": <float 0-1>,
  "hallucinationScore": <float 0-1>,
  "evaluation": "<detailed evaluation text>",
  "evaluationScore": <float 0-1>,
  "evaluationFeedback": "<specific feedback and suggestions>",
  "hallucinationFeedback": "<specific examples of any hallucinations found. If none, return 'None'>"
}}"#,
        user = candidate.user_prompt,
        system = candidate.system_prompt,
        expected = candidate.expected_output,
        response = candidate.response,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_every_input_and_json_keys() {
        let prompt = judge_instructions(&Candidate {
            system_prompt: "You are concise.",
            user_prompt: "2+2?",
            expected_output: "4",
            response: "The answer is 4.",
        });

        assert!(prompt.contains("User Prompt: 2+2?"));
        assert!(prompt.contains("System Prompt: You are concise."));
        assert!(prompt.contains("Expected Output: 4"));
        assert!(prompt.contains("Model Response: The answer is 4."));
        for key in ["relevanceScore", "hallucinationScore", "evaluationScore", "hallucinationFeedback"] {
            assert!(prompt.contains(key), "missing {key}");
        }
    }
}
