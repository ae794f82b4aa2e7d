//! String functions: concat, toString, convertMarkdown

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use super::{
    check_arity, check_keywords, evaluate_positional, invoker, pending, required_keyword, Arg,
    Descriptor, Invoker,
};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::result::EvalResult;
use crate::tree::Tree;

/// Text form of a value: strings as-is, null as the empty string, other
/// scalars displayed, collections as compact JSON.
pub fn stringify(tree: &Tree) -> Result<String> {
    match tree {
        Tree::Null => Ok(String::new()),
        Tree::Bool(b) => Ok(b.to_string()),
        Tree::Number(n) => Ok(n.to_string()),
        Tree::String(s) => Ok(s.clone()),
        Tree::Sequence(_) | Tree::Mapping(_) => Ok(serde_json::to_string(tree)?),
        Tree::Thunk(_) | Tree::Foreign(_) => Err(Error::UnsupportedValue {
            type_name: tree.type_name().to_string(),
        }),
    }
}

pub(crate) fn concat() -> Arc<dyn Descriptor> {
    Arc::new(Concat)
}

pub(crate) fn to_string() -> Arc<dyn Descriptor> {
    Arc::new(ToString)
}

pub(crate) fn convert_markdown() -> Arc<dyn Descriptor> {
    Arc::new(ConvertMarkdown)
}

struct Concat;

impl Descriptor for Concat {
    fn description(&self) -> &'static str {
        "Concatenates the text form of all arguments"
    }

    fn positional_invoker<'a>(&self, args: Vec<Arg<'a>>) -> Result<Box<dyn Invoker + 'a>> {
        Ok(invoker(move |ctx: &Context| {
            let (values, unresolvable) = evaluate_positional(ctx, &args)?;
            if !unresolvable.is_empty() {
                return Ok(pending(unresolvable));
            }
            let mut out = String::new();
            for (index, value) in values.iter().enumerate() {
                out.push_str(&stringify(value).map_err(|err| Error::positional_arg(index, err))?);
            }
            Ok(EvalResult::new(Tree::String(out)))
        }))
    }
}

struct ToString;

impl Descriptor for ToString {
    fn description(&self) -> &'static str {
        "Converts a value to its text form"
    }

    fn positional_invoker<'a>(&self, args: Vec<Arg<'a>>) -> Result<Box<dyn Invoker + 'a>> {
        check_arity(1, false, args.len())?;
        Ok(invoker(move |ctx: &Context| {
            let (values, unresolvable) = evaluate_positional(ctx, &args)?;
            if !unresolvable.is_empty() {
                return Ok(pending(unresolvable));
            }
            let text = stringify(&values[0]).map_err(|err| Error::positional_arg(0, err))?;
            Ok(EvalResult::new(Tree::String(text)))
        }))
    }
}

struct ConvertMarkdown;

impl ConvertMarkdown {
    fn invoke(ctx: &Context, to: &Arg<'_>, content: &Arg<'_>, names: [&str; 2]) -> Result<EvalResult> {
        let to_result = to
            .evaluate_all(ctx)
            .map_err(|err| arg_error(names[0], 0, err))?;
        let content_result = content
            .evaluate_all(ctx)
            .map_err(|err| arg_error(names[1], 1, err))?;

        let mut unresolvable = to_result.unresolvable;
        unresolvable.extends(content_result.unresolvable);
        if !unresolvable.is_empty() {
            return Ok(pending(unresolvable));
        }

        let target = match &to_result.value {
            Tree::String(s) => s.as_str(),
            other => {
                return Err(arg_error(
                    names[0],
                    0,
                    Error::unexpected_type(&["string"], other.type_name()),
                ))
            }
        };
        let markdown = match &content_result.value {
            Tree::String(s) => s.as_str(),
            other => {
                return Err(arg_error(
                    names[1],
                    1,
                    Error::unexpected_type(&["string"], other.type_name()),
                ))
            }
        };

        match target {
            "jira" => Ok(EvalResult::new(Tree::String(markdown_to_jira(markdown)?))),
            other => Err(arg_error(
                names[0],
                0,
                Error::Type(format!("unsupported conversion target {other:?}")),
            )),
        }
    }
}

/// Positional errors are reported by index, keyword errors by name.
fn arg_error(name: &str, index: usize, err: Error) -> Error {
    if name.is_empty() {
        Error::positional_arg(index, err)
    } else {
        Error::keyword_arg(name, err)
    }
}

impl Descriptor for ConvertMarkdown {
    fn description(&self) -> &'static str {
        "Converts Markdown text to another markup language (supported: jira)"
    }

    fn positional_invoker<'a>(&self, args: Vec<Arg<'a>>) -> Result<Box<dyn Invoker + 'a>> {
        check_arity(2, false, args.len())?;
        Ok(invoker(move |ctx: &Context| {
            Self::invoke(ctx, &args[0], &args[1], ["", ""])
        }))
    }

    fn keyword_invoker<'a>(
        &self,
        args: BTreeMap<String, Arg<'a>>,
    ) -> Result<Box<dyn Invoker + 'a>> {
        check_keywords(&args, &["to", "content"])?;
        let to = required_keyword(&args, "to")?.clone();
        let content = required_keyword(&args, "content")?.clone();
        Ok(invoker(move |ctx: &Context| {
            Self::invoke(ctx, &to, &content, ["to", "content"])
        }))
    }
}

struct InlineRules {
    code: Regex,
    image: Regex,
    link: Regex,
    strong: Regex,
    strong_underscore: Regex,
    emphasis: Regex,
    strike: Regex,
}

fn inline_rules() -> Result<&'static InlineRules> {
    static RULES: OnceLock<std::result::Result<InlineRules, regex::Error>> = OnceLock::new();
    RULES
        .get_or_init(|| {
            Ok(InlineRules {
                code: Regex::new(r"`([^`]+)`")?,
                image: Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)")?,
                link: Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)")?,
                strong: Regex::new(r"\*\*(.+?)\*\*")?,
                strong_underscore: Regex::new(r"__(.+?)__")?,
                emphasis: Regex::new(r"\*([^*\s][^*]*?)\*")?,
                strike: Regex::new(r"~~(.+?)~~")?,
            })
        })
        .as_ref()
        .map_err(invalid_rule)
}

fn invalid_rule(err: &regex::Error) -> Error {
    Error::Parse(format!("invalid built-in markdown rule: {err}"))
}

struct BlockRules {
    heading: Regex,
    bullet: Regex,
    numbered: Regex,
    quote: Regex,
    rule: Regex,
    fence: Regex,
}

fn block_rules() -> Result<&'static BlockRules> {
    static RULES: OnceLock<std::result::Result<BlockRules, regex::Error>> = OnceLock::new();
    RULES
        .get_or_init(|| {
            Ok(BlockRules {
                heading: Regex::new(r"^(#{1,6})\s+(.*?)\s*#*\s*$")?,
                bullet: Regex::new(r"^(\s*)[-*+]\s+(.*)$")?,
                numbered: Regex::new(r"^(\s*)\d+[.)]\s+(.*)$")?,
                quote: Regex::new(r"^>\s?(.*)$")?,
                rule: Regex::new(r"^\s*([-*_])(\s*[-*_]){2,}\s*$")?,
                fence: Regex::new(r"^\s*```\s*([\w+-]*)\s*$")?,
            })
        })
        .as_ref()
        .map_err(invalid_rule)
}

/// Convert Markdown to Jira wiki markup.
pub fn markdown_to_jira(markdown: &str) -> Result<String> {
    let blocks = block_rules()?;
    let mut out: Vec<String> = Vec::new();
    let mut in_code = false;

    for line in markdown.lines() {
        if let Some(caps) = blocks.fence.captures(line) {
            if in_code {
                out.push("{code}".to_string());
            } else if caps[1].is_empty() {
                out.push("{code}".to_string());
            } else {
                out.push(format!("{{code:{}}}", &caps[1]));
            }
            in_code = !in_code;
            continue;
        }
        if in_code {
            out.push(line.to_string());
            continue;
        }

        let converted = if let Some(caps) = blocks.heading.captures(line) {
            format!("h{}. {}", caps[1].len(), convert_inline(&caps[2])?)
        } else if blocks.rule.is_match(line) {
            "----".to_string()
        } else if let Some(caps) = blocks.bullet.captures(line) {
            let level = caps[1].len() / 2 + 1;
            format!("{} {}", "*".repeat(level), convert_inline(&caps[2])?)
        } else if let Some(caps) = blocks.numbered.captures(line) {
            let level = caps[1].len() / 2 + 1;
            format!("{} {}", "#".repeat(level), convert_inline(&caps[2])?)
        } else if let Some(caps) = blocks.quote.captures(line) {
            format!("bq. {}", convert_inline(&caps[1])?)
        } else {
            convert_inline(line)?
        };
        out.push(converted);
    }

    Ok(out.join("\n"))
}

/// Inline markup, leaving code spans untouched apart from their delimiters.
fn convert_inline(text: &str) -> Result<String> {
    let rules = inline_rules()?;
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in rules.code.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&convert_spans(rules, &text[last..whole.start()]));
        out.push_str("{{");
        out.push_str(&caps[1]);
        out.push_str("}}");
        last = whole.end();
    }
    out.push_str(&convert_spans(rules, &text[last..]));
    Ok(out)
}

fn convert_spans(rules: &InlineRules, text: &str) -> String {
    // Strong markers are parked on a control character so the emphasis rule
    // cannot rewrite them again.
    const STRONG: &str = "\u{1}";

    let text = rules.image.replace_all(text, "!$2!");
    let text = rules.link.replace_all(&text, "[$1|$2]");
    let text = rules.strong.replace_all(&text, format!("{STRONG}$1{STRONG}").as_str());
    let text = rules
        .strong_underscore
        .replace_all(&text, format!("{STRONG}$1{STRONG}").as_str());
    let text = rules.emphasis.replace_all(&text, "_${1}_");
    let text = rules.strike.replace_all(&text, "-$1-");
    text.replace(STRONG, "*")
}
