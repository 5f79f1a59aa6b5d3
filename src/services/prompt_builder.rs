use crate::types::tab::Tab;

const ORGANIZE_RULES: &str = "You are a tab organization assistant. Analyze these browser tabs and group them into logical categories.

Rules:
- Create categories based on the content/purpose of the tabs
- Use clear, concise category names (max 20 chars)
- Each category name must be UNIQUE
- Every tab ID in the input MUST appear in the output, in EXACTLY ONE category
- Do NOT invent any new tab IDs that are not in the input
- Use category names like: Work, Shopping, Social Media, News, Entertainment, Research, Development, Education, or similar";

/// Builds the categorization prompt for `tabs`.
///
/// A non-blank `custom_instruction` is inserted before the tab listing.
pub fn build_organize_prompt(tabs: &[Tab], custom_instruction: &str) -> String {
    let mut prompt = String::from(ORGANIZE_RULES);

    let instruction = custom_instruction.trim();
    if !instruction.is_empty() {
        prompt.push_str("\n\nAdditional Instructions:\n");
        prompt.push_str(instruction);
    }

    let listing = serde_json::to_string_pretty(tabs).unwrap_or_else(|_| "[]".to_string());
    prompt.push_str("\n\nTabs to organize:\n");
    prompt.push_str(&listing);
    prompt
}
