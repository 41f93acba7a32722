// src/utils/slug.rs

use std::sync::LazyLock;

use regex::Regex;

use crate::{error::AppError, store::ForumStore};

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("valid regex"));

/// Post slugs are stored as VARCHAR(220); the base leaves room for a `-N` suffix.
pub const POST_SLUG_BASE_LEN: usize = 210;
/// Category slugs are stored as VARCHAR(120).
pub const CATEGORY_SLUG_LEN: usize = 120;

fn transliterate(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' | 'ё' | 'э' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' | 'ы' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' | 'ь' => "",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

/// Turns a title into a URL slug. Cyrillic is transliterated, anything
/// else outside `[a-z0-9]` is dropped. May return an empty string.
pub fn slugify(input: &str) -> String {
    let mut latin = String::with_capacity(input.len());
    for ch in input.trim().to_lowercase().chars() {
        match transliterate(ch) {
            Some(s) => latin.push_str(s),
            None => latin.push(ch),
        }
    }

    let cleaned = DISALLOWED.replace_all(&latin, "");
    let dashed = WHITESPACE.replace_all(&cleaned, "-");
    let collapsed = DASHES.replace_all(&dashed, "-");
    collapsed.trim_matches('-').to_string()
}

/// Cuts a slug to at most `max` characters without leaving a trailing dash.
pub fn truncate_slug(slug: &str, max: usize) -> String {
    let cut: String = slug.chars().take(max).collect();
    cut.trim_end_matches('-').to_string()
}

/// Picks the first free slug among `base`, `base-1`, `base-2`, ...
pub async fn unique_post_slug(store: &dyn ForumStore, title: &str) -> Result<String, AppError> {
    let mut base = truncate_slug(&slugify(title), POST_SLUG_BASE_LEN);
    if base.is_empty() {
        base = "post".to_string();
    }

    let mut slug = base.clone();
    let mut suffix = 1;
    while store.slug_exists(&slug).await? {
        slug = format!("{}-{}", base, suffix);
        suffix += 1;
    }

    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_latin_title() {
        assert_eq!(slugify("  Best Builds for Elden Ring!! "), "best-builds-for-elden-ring");
        assert_eq!(slugify("a -- b"), "a-b");
    }

    #[test]
    fn slugify_transliterates_cyrillic() {
        assert_eq!(slugify("Щит и Жезл"), "schit-i-zhezl");
        assert_eq!(slugify("Подъезд"), "podezd");
    }

    #[test]
    fn slugify_can_be_empty() {
        assert_eq!(slugify("???"), "");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn truncate_slug_respects_limit_and_trailing_dash() {
        // transliteration triples the length of each letter
        let long = slugify(&"щ".repeat(200));
        assert_eq!(long.len(), 600);
        assert_eq!(truncate_slug(&long, POST_SLUG_BASE_LEN).len(), POST_SLUG_BASE_LEN);

        assert_eq!(truncate_slug("abc-def", 4), "abc");
        assert_eq!(truncate_slug("short", CATEGORY_SLUG_LEN), "short");
    }

    #[tokio::test]
    async fn unique_post_slug_fits_column_with_suffix() {
        use crate::models::user::{NewUser, Provider};
        use crate::models::post::NewPost;
        use crate::store::MemoryStore;

        let store = MemoryStore::new();
        let title = "щ".repeat(200);

        let first = unique_post_slug(&store, &title).await.unwrap();
        assert_eq!(first.len(), POST_SLUG_BASE_LEN);

        let author = store
            .create_user(NewUser {
                username: "writer".to_string(),
                email: None,
                password_hash: None,
                provider: Provider::Local,
                provider_id: None,
                role: "user".to_string(),
                avatar_url: None,
            })
            .await
            .unwrap();
        store
            .create_post(NewPost {
                author_id: author.id,
                category_id: None,
                title: title.clone(),
                slug: first.clone(),
                content: "body".to_string(),
                cover_image: None,
                is_published: true,
                tag_ids: Vec::new(),
            })
            .await
            .unwrap();

        let second = unique_post_slug(&store, &title).await.unwrap();
        assert_eq!(second, format!("{}-1", first));
        assert!(second.len() <= 220);
    }
}
