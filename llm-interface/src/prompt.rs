use serde::Serialize;
use threadcast_core::{AssembledDocument, Comment, GenerationConfig};

/// Wording of the instructions sent with every document.
#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub subreddit: String,
    pub role_description: String,
    pub focus: String,
    pub tweet_instructions: String,
}

impl PromptConfig {
    pub fn from_generation(subreddit: &str, generation: &GenerationConfig) -> Self {
        Self {
            subreddit: subreddit.to_string(),
            role_description: generation.role_description.clone(),
            focus: generation.focus.clone(),
            tweet_instructions: generation.tweet_instructions.clone(),
        }
    }

    pub fn system_message(&self) -> &str {
        &self.role_description
    }

    pub fn user_message(&self, document: &AssembledDocument) -> Result<String, serde_json::Error> {
        let rendered = serde_json::to_string_pretty(&PromptDocument::from(document))?;

        Ok(format!(
            "Analyze the following r/{subreddit} post and comments to generate a concise tweet with all necessary context:\n\
             \n\
             - Focus on {focus}.\n\
             - {instructions}\n\
             - Use the following structure exactly:\n\
             \n\
             ### Analysis ###\n\
             <A detailed analysis of the post and its comments, focusing on {focus}.>\n\
             \n\
             ### Tweet ###\n\
             <The generated tweet.>\n\
             \n\
             {rendered}",
            subreddit = self.subreddit,
            focus = self.focus,
            instructions = self.tweet_instructions,
            rendered = rendered,
        ))
    }
}

/// The view of a document that the model sees.
#[derive(Debug, Serialize)]
pub struct PromptDocument<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub body: &'a str,
    pub url: &'a str,
    pub num_comments: u32,
    pub score: i64,
    pub created_utc: String,
    pub comments: &'a [Comment],
}

impl<'a> From<&'a AssembledDocument> for PromptDocument<'a> {
    fn from(document: &'a AssembledDocument) -> Self {
        let item = &document.item;
        Self {
            title: &item.title,
            author: &item.author,
            body: item.display_body(),
            url: &item.url,
            num_comments: item.num_comments,
            score: item.score,
            created_utc: item.created_utc.format("%Y-%m-%d %H:%M:%S").to_string(),
            comments: &document.comments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use threadcast_core::{Item, LINK_POST_PLACEHOLDER};

    fn document(selftext: &str) -> AssembledDocument {
        AssembledDocument {
            item: Item {
                id: "abc".to_string(),
                title: "Endgame atlas changes".to_string(),
                selftext: selftext.to_string(),
                is_self: true,
                author: "exile".to_string(),
                url: "https://www.reddit.com/r/PathOfExile2/comments/abc/".to_string(),
                num_comments: 12,
                score: 88,
                created_utc: Utc.with_ymd_and_hms(2024, 12, 10, 9, 30, 0).unwrap(),
            },
            comments: vec![Comment {
                author: "helper".to_string(),
                body: "Towers feel better now".to_string(),
                score: 30,
                replies: vec![Comment {
                    author: "None".to_string(),
                    body: "[deleted]".to_string(),
                    score: 0,
                    replies: Vec::new(),
                }],
            }],
        }
    }

    #[test]
    fn test_prompt_document_view() {
        let doc = document("What do you think?");
        let value = serde_json::to_value(PromptDocument::from(&doc)).unwrap();

        assert_eq!(value["title"], "Endgame atlas changes");
        assert_eq!(value["body"], "What do you think?");
        assert_eq!(value["created_utc"], "2024-12-10 09:30:00");
        assert_eq!(value["comments"][0]["author"], "helper");
        assert_eq!(value["comments"][0]["replies"][0]["author"], "None");
        assert_eq!(value["comments"][0]["replies"][0]["score"], 0);
    }

    #[test]
    fn test_empty_body_uses_placeholder() {
        let doc = document("  ");
        let view = PromptDocument::from(&doc);
        assert_eq!(view.body, LINK_POST_PLACEHOLDER);
    }

    #[test]
    fn test_user_message_contains_markers_and_document() {
        let config = PromptConfig::from_generation("PathOfExile2", &GenerationConfig::default());
        let message = config.user_message(&document("Body")).unwrap();

        assert!(message.contains("r/PathOfExile2"));
        assert!(message.contains("### Analysis ###"));
        assert!(message.contains("### Tweet ###"));
        assert!(message.contains("\"title\": \"Endgame atlas changes\""));
        assert!(message.find("### Analysis ###") < message.find("### Tweet ###"));
        assert_eq!(config.system_message(), GenerationConfig::default().role_description);
    }
}
