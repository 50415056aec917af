//! Structured brainstorming: wraps the prompt in a methodology-specific
//! ideation frame before handing it to the engine.

use gmt_core::{EngineError, InvocationRequest};
use gmt_engine::{Engine, InvocationContext};
use serde_json::{Value, json};

use super::{McpToolDef, opt_index, opt_str, require_str, text_payload};

const DEFAULT_IDEA_COUNT: usize = 12;

pub fn def() -> McpToolDef {
    McpToolDef {
        name: "brainstorm",
        description: "Generate novel ideas with a structured brainstorming methodology. Supports \
                      domain context, constraints, and optional feasibility analysis. \
                      Methodologies: divergent, convergent, scamper, design-thinking, lateral, \
                      auto.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "The challenge or question to brainstorm on"
                },
                "methodology": {
                    "type": "string",
                    "description": "Brainstorming framework: divergent (default), convergent, \
                                    scamper, design-thinking, lateral, or auto"
                },
                "domain": {
                    "type": "string",
                    "description": "Domain context for specialized brainstorming (e.g. \
                                    'software', 'product', 'research')"
                },
                "constraints": {
                    "type": "string",
                    "description": "Known limitations or requirements the ideas must respect"
                },
                "existingContext": {
                    "type": "string",
                    "description": "Background information to build upon"
                },
                "ideaCount": {
                    "type": "number",
                    "description": "Target number of ideas to generate (default 12)"
                },
                "includeAnalysis": {
                    "type": "boolean",
                    "description": "Include feasibility and impact analysis per idea (default true)"
                },
                "model": {
                    "type": "string",
                    "description": "Optional model override"
                }
            },
            "required": ["prompt"]
        }),
    }
}

fn methodology_frame(methodology: &str) -> &'static str {
    match methodology {
        "convergent" => {
            "Use convergent thinking: narrow toward the strongest, most practical solutions, \
             merging overlapping ideas and discarding weak ones."
        }
        "scamper" => {
            "Apply the SCAMPER framework: Substitute, Combine, Adapt, Modify, Put to another \
             use, Eliminate, Reverse. Work through each lens."
        }
        "design-thinking" => {
            "Use a design-thinking lens: start from user needs and pain points, then ideate \
             solutions grounded in those needs."
        }
        "lateral" => {
            "Use lateral thinking: challenge assumptions, invert the problem, and draw \
             analogies from unrelated domains to reach non-obvious ideas."
        }
        // "divergent" and "auto" both open wide; the model picks its own frame
        // for "auto" inputs it judges convergent.
        _ => {
            "Use divergent thinking: generate a wide spread of distinct ideas, including \
             unconventional ones, without filtering for feasibility yet."
        }
    }
}

pub struct BrainstormArgs<'a> {
    pub prompt: &'a str,
    pub methodology: &'a str,
    pub domain: Option<&'a str>,
    pub constraints: Option<&'a str>,
    pub existing_context: Option<&'a str>,
    pub idea_count: usize,
    pub include_analysis: bool,
}

pub fn brainstorm_prompt(args: &BrainstormArgs) -> String {
    let mut prompt = String::from("You are facilitating a structured brainstorming session.\n\n");
    prompt.push_str(methodology_frame(args.methodology));
    prompt.push('\n');

    if let Some(domain) = args.domain {
        prompt.push_str(&format!("\nDomain context: {domain}\n"));
    }
    if let Some(context) = args.existing_context {
        prompt.push_str(&format!("\nBackground to build upon:\n{context}\n"));
    }
    if let Some(constraints) = args.constraints {
        prompt.push_str(&format!("\nConstraints the ideas must respect:\n{constraints}\n"));
    }

    prompt.push_str(&format!(
        "\nGenerate {} distinct ideas for the following challenge:\n\n{}\n\n\
         For each idea give a short title and a concise explanation.",
        args.idea_count, args.prompt
    ));

    if args.include_analysis {
        prompt.push_str(
            "\n\nFor each idea also assess feasibility, potential impact, and the main risk.",
        );
    }
    prompt
}

pub async fn handle(
    engine: &Engine,
    args: &Value,
    ctx: &InvocationContext,
) -> Result<Value, EngineError> {
    let include_analysis = match args.get("includeAnalysis") {
        None | Some(Value::Null) => true,
        Some(_) => super::opt_bool(args, "includeAnalysis"),
    };
    let brainstorm = BrainstormArgs {
        prompt: require_str(args, "prompt")?,
        methodology: opt_str(args, "methodology").unwrap_or("divergent"),
        domain: opt_str(args, "domain"),
        constraints: opt_str(args, "constraints"),
        existing_context: opt_str(args, "existingContext"),
        idea_count: opt_index(args, "ideaCount")?.unwrap_or(DEFAULT_IDEA_COUNT),
        include_analysis,
    };

    let req = InvocationRequest::new(brainstorm_prompt(&brainstorm))
        .with_model(opt_str(args, "model").map(String::from));
    let invocation = engine.invoke(&req, ctx).await?;
    Ok(text_payload(format!("Gemini response:\n\n{}", invocation.text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args<'a>(prompt: &'a str) -> BrainstormArgs<'a> {
        BrainstormArgs {
            prompt,
            methodology: "divergent",
            domain: None,
            constraints: None,
            existing_context: None,
            idea_count: DEFAULT_IDEA_COUNT,
            include_analysis: true,
        }
    }

    #[test]
    fn test_prompt_embeds_challenge_and_count() {
        let prompt = brainstorm_prompt(&base_args("reduce cold-start latency"));
        assert!(prompt.contains("Generate 12 distinct ideas"));
        assert!(prompt.contains("reduce cold-start latency"));
        assert!(prompt.contains("divergent thinking"));
        assert!(prompt.contains("feasibility"));
    }

    #[test]
    fn test_methodology_frames_differ() {
        let mut args = base_args("challenge");
        args.methodology = "scamper";
        assert!(brainstorm_prompt(&args).contains("SCAMPER"));
        args.methodology = "lateral";
        assert!(brainstorm_prompt(&args).contains("lateral thinking"));
        // Unknown methodologies fall back to the divergent frame.
        args.methodology = "nonsense";
        assert!(brainstorm_prompt(&args).contains("divergent thinking"));
    }

    #[test]
    fn test_optional_sections_appear_only_when_given() {
        let bare = brainstorm_prompt(&base_args("challenge"));
        assert!(!bare.contains("Domain context"));
        assert!(!bare.contains("Constraints"));

        let mut args = base_args("challenge");
        args.domain = Some("embedded firmware");
        args.constraints = Some("no heap allocation");
        args.existing_context = Some("current driver uses polling");
        let full = brainstorm_prompt(&args);
        assert!(full.contains("Domain context: embedded firmware"));
        assert!(full.contains("no heap allocation"));
        assert!(full.contains("current driver uses polling"));
    }

    #[test]
    fn test_analysis_section_can_be_disabled() {
        let mut args = base_args("challenge");
        args.include_analysis = false;
        assert!(!brainstorm_prompt(&args).contains("feasibility"));
    }
}
