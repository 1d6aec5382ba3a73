//! Few-shot prompt for structuring raw card OCR text.
//!
//! The examples are deliberately messy: OCR output from glossy business cards
//! is full of layout noise, and the model must still find the six fields.

const INSTRUCTIONS: &str = "You are a helpful assistant. Your job is to extract the visitor \
information from the text and format it into a JSON structured format. If you don't find any \
information, return null for the particular key in the JSON.";

const EXAMPLE_INPUT_1: &str = "BERKSHIRE

HATHAWAY >
HomeServices A ;

Patricia Johnson ]

Realtor\u{ae} %

Cell: (876) 543-2109 [4 i

Office: (987) 654-3210 VW /

Patricia@Berkshire.com | y

www.Berkshire.com

1234 Some Street, City State Zip

Each Office is Independently Owned and Operated =";

const EXAMPLE_OUTPUT_1: &str = r#"{
  "name": "Patricia Johnson",
  "designation": "Realtor®",
  "company": "Berkshire",
  "email": "Patricia@Berkshire.com",
  "phone": "(876) 543-2109",
  "website": "www.Berkshire.com"
}"#;

const EXAMPLE_INPUT_2: &str = "James Robert Smith
Realtor\u{ae}
1g Cell: (876) 543-2109
\\ & Office: (987) 654-3210
7 www.remix.com
- 4 REMIX?
4
1234 Some Street Name STE #
City State Zip";

const EXAMPLE_OUTPUT_2: &str = r#"{
  "name": "James Robert Smith",
  "designation": "Realtor®",
  "company": "REMIX",
  "email": null,
  "phone": "(876) 543-2109",
  "website": "www.remix.com"
}"#;

/// Build the full extraction prompt around the OCR text.
pub fn extraction_prompt(ocr_text: &str) -> String {
    format!(
        "{INSTRUCTIONS}\n\n\
         ###### EXAMPLE INPUT 1:\n{EXAMPLE_INPUT_1}\n\n\
         ###### EXAMPLE OUTPUT 1:\n{EXAMPLE_OUTPUT_1}\n\n\
         ###### EXAMPLE INPUT 2:\n{EXAMPLE_INPUT_2}\n\n\
         ###### EXAMPLE OUTPUT 2:\n{EXAMPLE_OUTPUT_2}\n\n\
         #######\nYour input is follows:\n\n######\n{ocr_text}\n######"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_input_and_examples() {
        let prompt = extraction_prompt("ACME CORP\nJane Doe");
        assert!(prompt.contains("Jane Doe"));
        assert!(prompt.contains("Patricia Johnson"));
        assert!(prompt.contains("James Robert Smith"));
        // Input text goes last so the model treats it as the query.
        let input_pos = prompt.rfind("Jane Doe").unwrap();
        let example_pos = prompt.rfind("James Robert Smith").unwrap();
        assert!(input_pos > example_pos);
    }
}
