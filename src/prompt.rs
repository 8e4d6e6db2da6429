//! Fixed prompts sent to the inference backend.
//!
//! The content-index filter (Test(s) / Sélection(s) sections only) lives in
//! the prompt text; the pipeline treats the backend's selection as
//! authoritative and does no keyword post-filtering.

/// Prompt for cover-page metadata extraction (sent with the cover image).
pub const COVER_PAGE_PROMPT: &str = "You are given a JPG file containing an image of a cover scan of a French publication. Based on typical naming conventions and any context you can infer, return only the title, publication number and publication month and year in the JSON format `{ \"title\": string, \"months\": [number,], \"year\": number, \"number\": number }`. If you cannot determine it, answer exactly `Unknown`. Do not add any extra explanation.";

/// Prompt for table-of-contents extraction (sent with a candidate page image).
pub const CONTENT_INDEX_PROMPT: &str = "This page should be a Summary page of a french magazine. Give me each section name with the page numbers. Returns the structure in the following Json format: {\"error\": string, \"entries\": [{\"title\": string, \"pageNumbers\": [number]}]}. Order the result by the Numbers from the lower number to the highest. Only keep the entries that have the words 'Test(s)', 'Sélection(s)' (case insensitive).";

/// Prompt for per-section review extraction (sent with a referenced page image).
pub const REVIEW_PAGE_PROMPT: &str = "This page is a test of a game. Find the name of the game and the console it is on. If it is on the page, return the score given to the game. The result should be returned in the following Json format: {\"title\": string, \"console\": string, \"score\": number, \"outOf\": number}.";

/// Build the ordering prompt embedding every discovered file name.
///
/// Requests a JSON array of `{file, number}` objects sorted by inferred page
/// number, with the 0-start shift rule spelled out.
pub fn ordering_prompt(file_names: &[String]) -> String {
    let mut prompt = String::from(
        "Below are the files found in one directory of scanned publication pages. \
         Based on the information in the names, sort them according to their page \
         number and return a JSON array of objects of the form \
         [{\"file\": string, \"number\": number}], ordered by number ascending. \
         If the inferred numbering starts at 0, shift it so the first page is \
         numbered 1. Return only valid JSON and no extra text.\n",
    );
    for name in file_names {
        prompt.push_str(name);
        prompt.push('\n');
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_prompt_embeds_all_names() {
        let names = vec!["p2.jpg".to_string(), "p1.jpg".to_string()];
        let prompt = ordering_prompt(&names);
        assert!(prompt.contains("p2.jpg\n"));
        assert!(prompt.contains("p1.jpg\n"));
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn test_ordering_prompt_no_files() {
        let prompt = ordering_prompt(&[]);
        assert!(prompt.ends_with("no extra text.\n"));
    }

    #[test]
    fn test_fixed_prompts_request_json_shapes() {
        assert!(COVER_PAGE_PROMPT.contains("\"months\""));
        assert!(CONTENT_INDEX_PROMPT.contains("pageNumbers"));
        assert!(REVIEW_PAGE_PROMPT.contains("outOf"));
    }
}
