//! Prompt builders for the three model tasks of the flow.

/// Grounded answer prompt over the retrieved context.
pub fn answer_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a chatbot answering questions about documents uploaded by a user. \
Use the provided context to answer the question.
You may infer reasonable conclusions if they logically follow from the context and extend the answer.
Do not mention the existence of \"context\" or \"document\" in your response. \
Do not mention anything referring to the document provided.
The context you see has already been collected from the documents for you to answer questions from.
Make your answer readable by utilizing bullet points whenever possible.

Context: {context}
Question: {query}
Answer:"
    )
}

/// Relevance grading prompt; the model must reply with a bare integer.
pub fn judge_prompt(query: &str, documents: &str, answer: &str) -> String {
    format!(
        "You are an answer evaluator. Your task is to determine the relevance of a generated answer \
to the user's query based on the provided documents that act as context. A relevant answer is \
one that fulfils the user's query and is supported by the context. Rate the relevance on a scale \
from 1 (not relevant) to 10 (highly relevant).
Respond with only the number.

User Query: {query}
Retrieved Documents: {documents}
Generated Answer: {answer}

Relevance Score (1-10):"
    )
}

/// Query reformulation prompt, fed with what the failed attempt retrieved.
pub fn rewrite_prompt(original_query: &str, retrieved_content: &str) -> String {
    format!(
        "You are a query re-writer. The initial retrieval for the user's query was unsuccessful.
To help you, here is the original query and the content that was retrieved initially. \
Analyze the retrieved content to get clues on what the user might be looking for, and rephrase \
the original query to be more effective for a new retrieval attempt. Your goal is to find a query \
that is more specific and better suited for a vector search.
Only return the rephrased query without any additional text.

Original Query: {original_query}

Initially Retrieved Content:
{retrieved_content}

Rephrased Query:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_embed_their_inputs() {
        let a = answer_prompt("What is the refund policy?", "Refunds within 30 days");
        assert!(a.contains("Context: Refunds within 30 days\nQuestion: What is the refund policy?"));
        assert!(a.ends_with("Answer:"));

        let j = judge_prompt("q", "docs", "ans");
        assert!(j.contains("Respond with only the number."));
        assert!(j.contains("Generated Answer: ans"));

        let r = rewrite_prompt("q", "");
        assert!(r.contains("Original Query: q"));
        assert!(r.ends_with("Rephrased Query:"));
    }
}
