use anyhow::{Context, Result};
use serde::Deserialize;
use serenity::all::CreateEmbed;
use wana_kana::{ConvertJapanese, IsJapaneseStr};

use crate::misc::shortify;

const SEARCH_URL: &str = "https://jisho.org/api/v1/search/words";
const JISHO_GREEN: u32 = 0x56D926;
const FIELD_LIMIT: usize = 1024;
const EMPTY_FIELD_NAME: &str = "\u{200b}";

#[derive(Debug, Deserialize)]
pub struct JishoResponse {
    pub meta: Meta,
    #[serde(default)]
    pub data: Vec<Word>,
}

#[derive(Debug, Deserialize)]
pub struct Meta {
    pub status: u16,
}

#[derive(Debug, Deserialize)]
pub struct Word {
    pub slug: String,
    #[serde(default)]
    pub is_common: Option<bool>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub jlpt: Vec<String>,
    #[serde(default)]
    pub japanese: Vec<Japanese>,
    #[serde(default)]
    pub senses: Vec<Sense>,
}

#[derive(Debug, Deserialize)]
pub struct Japanese {
    pub word: Option<String>,
    pub reading: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Sense {
    pub english_definitions: Vec<String>,
    pub parts_of_speech: Vec<String>,
    pub links: Vec<Link>,
    pub tags: Vec<String>,
    pub restrictions: Vec<String>,
    pub see_also: Vec<String>,
    pub info: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Link {
    pub text: String,
    pub url: String,
}

pub async fn search(http: &reqwest::Client, keyword: &str) -> Result<JishoResponse> {
    http.get(SEARCH_URL)
        .query(&[("keyword", keyword)])
        .send()
        .await?
        .json::<JishoResponse>()
        .await
        .context("Jisho sent an unreadable response")
}

/// Choices offered while the user types a word.
pub fn suggestions(input: &str) -> Vec<String> {
    let input = input.trim();
    if input.is_empty() {
        return vec!["例え".to_owned()];
    }
    let mut choices = vec![input.to_owned()];
    // Romaji that reads as kana gets the quoted exact-match choice too.
    if input.to_hiragana().as_str().is_hiragana() {
        choices.push(format!("\"{input}\""));
    }
    choices
}

fn search_link(term: &str) -> String {
    format!("https://jisho.org/search/{}", term.replace(' ', "%20"))
}

impl Word {
    pub fn tag_labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if self.is_common == Some(true) {
            labels.push("common word".to_owned());
        }
        for tag in &self.tags {
            match tag.strip_prefix("wanikani") {
                Some(level) => labels.push(format!("wanikani lvl{level}")),
                None => log::debug!("Unhandled Jisho tag {tag}"),
            }
        }
        labels.extend(self.jlpt.iter().map(|level| level.replacen('-', " ", 1)));
        labels
    }

    /// Senses grouped under their parts of speech as `(name, value)` pairs.
    pub fn sense_fields(&self) -> Vec<(String, String)> {
        let mut fields: Vec<(String, String)> = Vec::new();
        for (i, sense) in self.senses.iter().enumerate() {
            let content = sense.describe(i + 1);
            match fields.last_mut() {
                Some((_, value)) if sense.parts_of_speech.is_empty() => {
                    value.push('\n');
                    value.push_str(&content);
                }
                _ => {
                    let name = if sense.parts_of_speech.is_empty() {
                        EMPTY_FIELD_NAME.to_owned()
                    } else {
                        sense.parts_of_speech.join(", ")
                    };
                    fields.push((name, content));
                }
            }
        }
        fields
    }

    pub fn other_forms(&self) -> Option<String> {
        let forms: Vec<String> = self
            .japanese
            .iter()
            .skip(1)
            .map(|form| match (&form.word, &form.reading) {
                (Some(word), Some(reading)) => format!("{word} 【{reading}】"),
                (Some(word), None) => word.clone(),
                (None, Some(reading)) => reading.clone(),
                (None, None) => String::new(),
            })
            .filter(|form| !form.is_empty())
            .collect();
        (!forms.is_empty()).then(|| forms.join("、"))
    }

    pub fn to_embed(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::new()
            .title(&self.slug)
            .url(format!("https://jisho.org/word/{}", self.slug.replace(' ', "%20")))
            .color(JISHO_GREEN);

        let tags = self.tag_labels();
        if !tags.is_empty() {
            embed = embed.description(format!("**tags**: {}", tags.join(" - ")));
        }
        for (name, value) in self.sense_fields() {
            embed = embed.field(name, shortify(&value, FIELD_LIMIT), false);
        }
        if let Some(forms) = self.other_forms() {
            embed = embed.field("Other forms", shortify(&forms, FIELD_LIMIT), false);
        }
        embed
    }
}

impl Sense {
    fn describe(&self, number: usize) -> String {
        let links = self
            .links
            .iter()
            .map(|link| format!("[{}]({})", link.text, link.url))
            .collect::<Vec<_>>()
            .join("\n");

        let notes: Vec<String> = self
            .tags
            .iter()
            .cloned()
            .chain(self.restrictions.iter().map(|rest| format!("Only applies to {rest}")))
            .chain(self.see_also.iter().map(|also| format!("See also [{also}]({})", search_link(also))))
            .chain(self.info.iter().cloned())
            .chain((!links.is_empty()).then_some(links))
            .collect();

        let definitions = format!("{number}. **{}**", self.english_definitions.join("; "));
        if notes.is_empty() {
            definitions
        } else {
            format!("{definitions} {}", notes.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn word() -> Word {
        serde_json::from_value(json!({
            "slug": "例え",
            "is_common": true,
            "tags": ["wanikani17"],
            "jlpt": ["jlpt-n3"],
            "japanese": [
                { "word": "例え", "reading": "たとえ" },
                { "word": "譬え", "reading": "たとえ" },
                { "reading": "たとい" }
            ],
            "senses": [
                {
                    "english_definitions": ["example", "instance"],
                    "parts_of_speech": ["Noun"],
                    "links": [],
                    "tags": [],
                    "restrictions": [],
                    "see_also": [],
                    "antonyms": [],
                    "source": [],
                    "info": []
                },
                {
                    "english_definitions": ["simile", "metaphor"],
                    "parts_of_speech": [],
                    "links": [{ "text": "Wikipedia", "url": "https://en.wikipedia.org/wiki/Simile" }],
                    "tags": ["Usually written using kana alone"],
                    "restrictions": ["例え"],
                    "see_also": ["比喩"],
                    "info": []
                },
                {
                    "english_definitions": ["even if"],
                    "parts_of_speech": ["Adverb"]
                }
            ],
            "attribution": { "jmdict": true, "jmnedict": false, "dbpedia": false }
        }))
        .unwrap()
    }

    #[test]
    fn tags_are_labelled() {
        assert_eq!(word().tag_labels(), vec!["common word", "wanikani lvl17", "jlpt n3"]);
    }

    #[test]
    fn senses_without_part_of_speech_join_the_previous_field() {
        let fields = word().sense_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].0, "Noun");
        assert_eq!(
            fields[0].1,
            "1. **example; instance**\n2. **simile; metaphor** Usually written using kana alone, \
             Only applies to 例え, See also [比喩](https://jisho.org/search/比喩), \
             [Wikipedia](https://en.wikipedia.org/wiki/Simile)"
        );
        assert_eq!(fields[1], ("Adverb".to_owned(), "3. **even if**".to_owned()));
    }

    #[test]
    fn other_forms_skip_the_headword() {
        assert_eq!(word().other_forms().as_deref(), Some("譬え 【たとえ】、たとい"));
    }

    #[test]
    fn optional_fields_may_be_missing() {
        let bare: Word = serde_json::from_value(json!({ "slug": "x" })).unwrap();
        assert!(bare.tag_labels().is_empty());
        assert!(bare.sense_fields().is_empty());
        assert!(bare.other_forms().is_none());

        let response: JishoResponse = serde_json::from_value(json!({ "meta": { "status": 200 } })).unwrap();
        assert!(response.data.is_empty());
    }

    #[test]
    fn kana_readable_input_suggests_exact_match() {
        assert_eq!(suggestions(""), vec!["例え"]);
        assert_eq!(suggestions("たとえ"), vec!["たとえ", "\"たとえ\""]);
        assert_eq!(suggestions("カード"), vec!["カード", "\"カード\""]);
        assert_eq!(suggestions("tabemono"), vec!["tabemono", "\"tabemono\""]);
        assert_eq!(suggestions("例え"), vec!["例え"]);
        assert_eq!(suggestions("123"), vec!["123"]);
    }
}
