use threadcast_core::{CoreError, LlmError, TweetExtraction};

pub const ANALYSIS_MARKER: &str = "### Analysis ###";
pub const TWEET_MARKER: &str = "### Tweet ###";

/// Pulls the message out of a model response.
///
/// Only the first `### Tweet ###` marker counts. The `### Analysis ###`
/// section is not required.
pub fn extract_tweet(response: &str, policy: TweetExtraction) -> Result<String, CoreError> {
    let start = response
        .find(TWEET_MARKER)
        .ok_or_else(|| LlmError::MissingTweetDelimiter {
            marker: TWEET_MARKER.to_string(),
        })?;
    let section = &response[start + TWEET_MARKER.len()..];

    let tweet = match policy {
        TweetExtraction::FirstLine => first_non_blank_line(section),
        TweetExtraction::Remainder => clean_remainder(section),
    };

    if tweet.is_empty() {
        return Err(LlmError::EmptyTweet.into());
    }
    Ok(tweet)
}

fn first_non_blank_line(section: &str) -> String {
    // The rest of the marker line is part of the header.
    section
        .lines()
        .skip(1)
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn clean_remainder(section: &str) -> String {
    let tweet = section.trim().trim_start_matches('#').trim();
    match tweet.chars().next() {
        Some(first) if !first.is_alphanumeric() => tweet
            .trim_start_matches(['.', '!', '?', ','])
            .trim()
            .to_string(),
        _ => tweet.to_string(),
    }
}
