/// Recipe import from web pages
///
/// Most recipe sites embed a schema.org `Recipe` as JSON-LD. The importer
/// fetches the page through a [`PageFetcher`], finds that object, and maps it
/// into a [`RecipeDraft`] with every string passed through
/// [`crate::sanitize`] and every ingredient line through
/// [`crate::ingredient`].
///
/// Before anything is fetched the URL must be http(s), its host must not be
/// on the configured blocklist, and (unless explicitly allowed) it must not
/// point at localhost or a private, loopback, or link-local address.
///
/// # Example
///
/// ```no_run
/// use larder_shared::import::{HttpFetcher, ImportConfig, RecipeImporter};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ImportConfig::default();
/// let fetcher = HttpFetcher::new(&config)?;
/// let importer = RecipeImporter::new(Arc::new(fetcher), config);
///
/// let draft = importer.import("https://cooking.example.com/pancakes").await?;
/// println!("{} ({} ingredients)", draft.title, draft.ingredients.len());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::{Host, Url};

use crate::ingredient::{parse_ingredient_line, quantity_in_range};
use crate::models::recipe::{IngredientInput, RecipeInput};
use crate::sanitize::{clean_multiline, clean_text, sanitize_url, validate_url};

/// Most ingredients kept from one page
pub const MAX_IMPORTED_INGREDIENTS: usize = 100;

/// Most steps kept from one page
pub const MAX_IMPORTED_STEPS: usize = 100;

const MAX_TITLE_CHARS: usize = 255;
const MAX_DESCRIPTION_CHARS: usize = 5000;
const MAX_STEP_CHARS: usize = 5000;
const MAX_MINUTES: i64 = 2880;
const MAX_SERVINGS: i64 = 100;

/// Error type for recipe import
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImportError {
    #[error("Invalid recipe URL: {0}")]
    InvalidUrl(String),

    #[error("Importing from {0} is not allowed")]
    BlockedSite(String),

    #[error("The recipe site took too long to respond")]
    Timeout,

    #[error("Could not reach the recipe site: {0}")]
    Network(String),

    #[error("The recipe site responded with HTTP {0}")]
    HttpStatus(u16),

    #[error("The page is larger than {max_bytes} bytes")]
    TooLarge { max_bytes: usize },

    #[error("The page's recipe data could not be read")]
    MalformedMarkup,

    #[error("No recipe was found on the page")]
    NoRecipeFound,
}

/// Import settings
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Whole-request timeout
    pub timeout: Duration,

    /// Largest response body read
    pub max_bytes: usize,

    pub user_agent: String,

    /// Hosts refused, matched as domain suffixes
    pub blocked_hosts: Vec<String>,

    /// Permits localhost and private addresses (tests and local setups)
    pub allow_private_hosts: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_bytes: 2 * 1024 * 1024,
            user_agent: concat!("Larder/", env!("CARGO_PKG_VERSION"), " (recipe import)")
                .to_string(),
            blocked_hosts: Vec::new(),
            allow_private_hosts: false,
        }
    }
}

fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.octets()[0] == 0
}

fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(v4);
    }

    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80
}

/// Whether an address is private, loopback, link-local, or unspecified
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => is_private_ipv6(v6),
    }
}

impl ImportConfig {
    /// Refuses blocked, local, and private hosts
    pub fn check_host(&self, url: &Url) -> Result<(), ImportError> {
        let host = url
            .host()
            .ok_or_else(|| ImportError::InvalidUrl("URL has no host".to_string()))?;

        match host {
            Host::Domain(domain) => {
                let domain = domain.trim_end_matches('.').to_lowercase();

                let blocked = self.blocked_hosts.iter().any(|entry| {
                    let entry = entry.trim().trim_start_matches('.').to_lowercase();
                    !entry.is_empty()
                        && (domain == entry || domain.ends_with(&format!(".{}", entry)))
                });
                if blocked {
                    return Err(ImportError::BlockedSite(domain));
                }

                if !self.allow_private_hosts
                    && (domain == "localhost" || domain.ends_with(".localhost"))
                {
                    return Err(ImportError::BlockedSite(domain));
                }
            }
            Host::Ipv4(ip) => {
                if !self.allow_private_hosts && is_private_ipv4(ip) {
                    return Err(ImportError::BlockedSite(ip.to_string()));
                }
            }
            Host::Ipv6(ip) => {
                if !self.allow_private_hosts && is_private_ipv6(ip) {
                    return Err(ImportError::BlockedSite(ip.to_string()));
                }
            }
        }

        Ok(())
    }
}

/// Source of page HTML
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the page body as text
    async fn fetch(&self, url: &Url) -> Result<String, ImportError>;
}

/// `reqwest`-backed fetcher
///
/// Redirects are followed (at most five) only while each target passes the
/// same host checks as the original URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &ImportConfig) -> Result<Self, ImportError> {
        let redirect_rules = config.clone();
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= 5 {
                attempt.error("too many redirects")
            } else if redirect_rules.check_host(attempt.url()).is_err() {
                attempt.stop()
            } else {
                attempt.follow()
            }
        });

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .redirect(policy)
            .build()
            .map_err(|e| ImportError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_bytes: config.max_bytes,
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ImportError {
    if e.is_timeout() {
        ImportError::Timeout
    } else {
        ImportError::Network(e.to_string())
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, ImportError> {
        let mut response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.is_redirection() {
            let target = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("redirect target")
                .to_string();
            return Err(ImportError::BlockedSite(target));
        }
        if !status.is_success() {
            return Err(ImportError::HttpStatus(status.as_u16()));
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(ImportError::TooLarge {
                max_bytes: self.max_bytes,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(ImportError::TooLarge {
                    max_bytes: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Sanitized recipe extracted from a page, not yet saved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDraft {
    pub title: String,
    pub description: Option<String>,
    pub source_url: String,
    pub image_url: Option<String>,
    pub servings: i32,
    pub prep_minutes: Option<i32>,
    pub cook_minutes: Option<i32>,
    pub ingredients: Vec<IngredientInput>,
    pub steps: Vec<String>,
}

impl From<RecipeDraft> for RecipeInput {
    fn from(draft: RecipeDraft) -> Self {
        RecipeInput {
            title: draft.title,
            description: draft.description,
            source_url: Some(draft.source_url),
            image_url: draft.image_url,
            servings: draft.servings,
            prep_minutes: draft.prep_minutes,
            cook_minutes: draft.cook_minutes,
            ingredients: draft.ingredients,
            steps: draft.steps,
        }
    }
}

/// Fetches pages and turns them into recipe drafts
#[derive(Clone)]
pub struct RecipeImporter {
    fetcher: Arc<dyn PageFetcher>,
    config: ImportConfig,
}

impl std::fmt::Debug for RecipeImporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipeImporter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RecipeImporter {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: ImportConfig) -> Self {
        Self { fetcher, config }
    }

    /// Validates a URL and applies host rules without fetching
    pub fn check_url(&self, input: &str) -> Result<Url, ImportError> {
        let valid = validate_url(input).map_err(|e| ImportError::InvalidUrl(e.to_string()))?;
        let url = Url::parse(&valid).map_err(|e| ImportError::InvalidUrl(e.to_string()))?;
        self.config.check_host(&url)?;
        Ok(url)
    }

    /// Imports the recipe at `input`
    ///
    /// # Errors
    ///
    /// Any [`ImportError`]; nothing is fetched when the URL check fails.
    pub async fn import(&self, input: &str) -> Result<RecipeDraft, ImportError> {
        let url = self.check_url(input)?;

        debug!(url = %url, "Fetching recipe page");
        let html = self.fetcher.fetch(&url).await.map_err(|e| {
            warn!(url = %url, error = %e, "Recipe page fetch failed");
            e
        })?;

        let draft = extract_recipe(&html, url.as_str())?;
        info!(
            url = %url,
            ingredients = draft.ingredients.len(),
            steps = draft.steps.len(),
            "Recipe imported"
        );

        Ok(draft)
    }
}

fn json_ld_pattern() -> &'static Regex {
    static JSON_LD: OnceLock<Regex> = OnceLock::new();
    JSON_LD.get_or_init(|| {
        Regex::new(
            r#"(?is)<script\b[^>]*\btype\s*=\s*["']?application/ld\+json["']?[^>]*>(.*?)</script\s*>"#,
        )
        .expect("Invalid JSON-LD regex")
    })
}

fn iso_duration_pattern() -> &'static Regex {
    static DURATION: OnceLock<Regex> = OnceLock::new();
    DURATION.get_or_init(|| {
        Regex::new(
            r"(?i)^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
        )
        .expect("Invalid duration regex")
    })
}

fn integer_pattern() -> &'static Regex {
    static INTEGER: OnceLock<Regex> = OnceLock::new();
    INTEGER.get_or_init(|| Regex::new(r"\d+").expect("Invalid integer regex"))
}

fn is_recipe_type(value: Option<&Value>) -> bool {
    let matches = |s: &str| s == "Recipe" || s.ends_with("/Recipe") || s.ends_with(":Recipe");
    match value {
        Some(Value::String(s)) => matches(s),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

/// Finds a `Recipe` object in a JSON-LD document
fn find_recipe(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_recipe),
        Value::Object(map) => {
            if is_recipe_type(map.get("@type")) {
                return Some(value);
            }
            ["@graph", "mainEntity", "mainEntityOfPage"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(find_recipe)
        }
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Array(items) => items.iter().find_map(as_text),
        _ => None,
    }
}

fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => sanitize_url(s),
        Value::Array(items) => items.iter().find_map(image_url),
        Value::Object(map) => map.get("url").or_else(|| map.get("@id")).and_then(image_url),
        _ => None,
    }
}

/// First integer in a `recipeYield`, clamped to 1..=100
fn servings(value: Option<&Value>) -> i32 {
    let found = match value {
        Some(Value::Number(n)) => n.as_f64().map(|f| f.round() as i64),
        Some(Value::String(s)) => integer_pattern()
            .find(s)
            .and_then(|m| m.as_str().parse::<i64>().ok()),
        Some(Value::Array(items)) => items.iter().find_map(|item| match item {
            Value::Number(n) => n.as_f64().map(|f| f.round() as i64),
            Value::String(s) => integer_pattern()
                .find(s)
                .and_then(|m| m.as_str().parse::<i64>().ok()),
            _ => None,
        }),
        _ => None,
    };

    found.unwrap_or(1).clamp(1, MAX_SERVINGS) as i32
}

/// Converts an ISO-8601 duration (`PT1H30M`, `P1DT2H`) into whole minutes
pub fn parse_iso8601_minutes(input: &str) -> Option<i32> {
    let input = input.trim();
    let caps = iso_duration_pattern().captures(input)?;

    if caps.iter().skip(1).all(|c| c.is_none()) {
        return None;
    }

    let part = |i: usize| -> i64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .unwrap_or(0)
    };
    let seconds = caps
        .get(4)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);

    let minutes = part(1) * 1440 + part(2) * 60 + part(3) + (seconds / 60.0).round() as i64;
    Some(minutes.clamp(0, MAX_MINUTES) as i32)
}

fn collect_steps(value: &Value, steps: &mut Vec<String>) {
    if steps.len() >= MAX_IMPORTED_STEPS {
        return;
    }

    match value {
        Value::String(s) => {
            for line in clean_multiline(s, usize::MAX).lines() {
                if steps.len() >= MAX_IMPORTED_STEPS {
                    break;
                }
                let step = clean_text(line, MAX_STEP_CHARS);
                if !step.is_empty() {
                    steps.push(step);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_steps(item, steps);
            }
        }
        Value::Object(map) => {
            if let Some(children) = map.get("itemListElement") {
                collect_steps(children, steps);
            } else if let Some(text) = map.get("text").or_else(|| map.get("name")).and_then(as_text) {
                let step = clean_multiline(text, MAX_STEP_CHARS);
                if !step.is_empty() {
                    steps.push(step);
                }
            }
        }
        _ => {}
    }
}

fn ingredient_lines(value: Option<&Value>) -> Vec<IngredientInput> {
    let lines: Vec<&str> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(s)) => s.lines().collect(),
        _ => Vec::new(),
    };

    lines
        .into_iter()
        .filter_map(parse_ingredient_line)
        .map(|mut parsed| {
            if parsed.quantity.is_some_and(|q| !quantity_in_range(q)) {
                parsed.quantity = None;
            }
            IngredientInput::from(parsed)
        })
        .take(MAX_IMPORTED_INGREDIENTS)
        .collect()
}

fn map_recipe(recipe: &Value, source_url: &str) -> Result<RecipeDraft, ImportError> {
    let title = recipe
        .get("name")
        .and_then(as_text)
        .map(|s| clean_text(s, MAX_TITLE_CHARS))
        .filter(|s| !s.is_empty())
        .ok_or(ImportError::NoRecipeFound)?;

    let description = recipe
        .get("description")
        .and_then(as_text)
        .map(|s| clean_multiline(s, MAX_DESCRIPTION_CHARS))
        .filter(|s| !s.is_empty());

    let minutes = |key: &str| recipe.get(key).and_then(as_text).and_then(parse_iso8601_minutes);

    let ingredients = ingredient_lines(
        recipe
            .get("recipeIngredient")
            .or_else(|| recipe.get("ingredients")),
    );

    let mut steps = Vec::new();
    if let Some(instructions) = recipe.get("recipeInstructions") {
        collect_steps(instructions, &mut steps);
    }

    Ok(RecipeDraft {
        title,
        description,
        source_url: source_url.to_string(),
        image_url: recipe.get("image").and_then(image_url),
        servings: servings(recipe.get("recipeYield")),
        prep_minutes: minutes("prepTime"),
        cook_minutes: minutes("cookTime"),
        ingredients,
        steps,
    })
}

/// Extracts a recipe draft from page HTML
///
/// # Errors
///
/// - `MalformedMarkup` when JSON-LD blocks exist but none parse and no recipe
///   is found
/// - `NoRecipeFound` when no block holds a named `Recipe`
pub fn extract_recipe(html: &str, source_url: &str) -> Result<RecipeDraft, ImportError> {
    let mut malformed = false;

    for caps in json_ld_pattern().captures_iter(html) {
        let raw = caps.get(1).map_or("", |m| m.as_str()).trim();
        if raw.is_empty() {
            continue;
        }

        let value = match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Skipping unparseable JSON-LD block");
                malformed = true;
                continue;
            }
        };

        if let Some(recipe) = find_recipe(&value) {
            return map_recipe(recipe, source_url);
        }
    }

    if malformed {
        Err(ImportError::MalformedMarkup)
    } else {
        Err(ImportError::NoRecipeFound)
    }
}
