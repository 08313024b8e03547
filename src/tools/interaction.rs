//! Handlers that drive the connected page: planned actions and single
//! located interactions.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::agent::{LocateOptions, ScrollDirection, ScrollParam, ScrollType};
use crate::error::ToolError;
use crate::tools::schema::{ParamSpec, ToolArgs, ToolSchema};
use crate::tools::{ToolContext, ToolFuture, ToolHandler};

fn deep_think_param(description: &'static str) -> ParamSpec {
    ParamSpec::boolean("deepThink", description).default_value(false)
}

fn locate_options(args: &ToolArgs) -> LocateOptions {
    LocateOptions {
        deep_think: args.flag("deepThink"),
    }
}

/// Handler for the `browser_ai_action` tool.
pub struct AiActionHandler;

impl ToolHandler for AiActionHandler {
    fn name(&self) -> &str {
        "browser_ai_action"
    }

    fn title(&self) -> Option<&str> {
        Some("Perform Action")
    }

    fn description(&self) -> &str {
        "Performs a series of UI actions described in natural language. The agent plans the steps and executes them sequentially. Use for complex or multi-step interactions where planning is beneficial."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().param(ParamSpec::string(
            "prompt",
            "A natural language description of the UI steps to perform.",
        ))
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            let agent = session.ensure_connected()?;
            agent.ai_action(args.str("prompt")).await?;
            Ok("Action sequence completed.".to_string())
        })
    }
}

/// Handler for the `browser_ai_tap` tool.
pub struct AiTapHandler;

impl ToolHandler for AiTapHandler {
    fn name(&self) -> &str {
        "browser_ai_tap"
    }

    fn title(&self) -> Option<&str> {
        Some("Tap Element")
    }

    fn description(&self) -> &str {
        "Performs a tap/click on a single element located from a natural language description. Faster and more reliable than a planned action for single steps."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .param(ParamSpec::string(
                "locate",
                "A natural language description of the element to tap.",
            ))
            .param(deep_think_param(
                "If true, uses a two-step AI call to precisely locate the element, useful for ambiguous elements.",
            ))
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            let agent = session.ensure_connected()?;
            let locate = args.str("locate");
            agent.ai_tap(locate, locate_options(&args)).await?;
            Ok(format!("Tapped element described by: \"{}\"", locate))
        })
    }
}

/// Handler for the `browser_ai_hover` tool.
pub struct AiHoverHandler;

impl ToolHandler for AiHoverHandler {
    fn name(&self) -> &str {
        "browser_ai_hover"
    }

    fn title(&self) -> Option<&str> {
        Some("Hover Element")
    }

    fn description(&self) -> &str {
        "Moves the mouse cursor over a specified element."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .param(ParamSpec::string(
                "locate",
                "A natural language description of the element to hover over.",
            ))
            .param(deep_think_param(
                "If true, uses a two-step AI call to precisely locate the element.",
            ))
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            let agent = session.ensure_connected()?;
            let locate = args.str("locate");
            agent.ai_hover(locate, locate_options(&args)).await?;
            Ok(format!("Hovered over element described by: \"{}\"", locate))
        })
    }
}

/// Handler for the `browser_ai_input` tool.
pub struct AiInputHandler;

impl ToolHandler for AiInputHandler {
    fn name(&self) -> &str {
        "browser_ai_input"
    }

    fn title(&self) -> Option<&str> {
        Some("Input Text")
    }

    fn description(&self) -> &str {
        "Inputs text into a specified element. Use an empty string to clear the input."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .param(ParamSpec::string(
                "text",
                "The final text content to be placed in the input element. Use an empty string to clear.",
            ))
            .param(ParamSpec::string(
                "locate",
                "A natural language description of the element to input text into.",
            ))
            .param(deep_think_param(
                "If true, uses a two-step AI call to precisely locate the element.",
            ))
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            let agent = session.ensure_connected()?;
            let text = args.str("text");
            let locate = args.str("locate");
            agent.ai_input(text, locate, locate_options(&args)).await?;
            Ok(format!(
                "Input \"{}\" into element described by: \"{}\"",
                text, locate
            ))
        })
    }
}

/// Handler for the `browser_ai_keyboard_press` tool.
pub struct AiKeyboardPressHandler;

impl ToolHandler for AiKeyboardPressHandler {
    fn name(&self) -> &str {
        "browser_ai_keyboard_press"
    }

    fn title(&self) -> Option<&str> {
        Some("Press Key")
    }

    fn description(&self) -> &str {
        "Presses a keyboard key, optionally after focusing a located element."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .param(ParamSpec::string(
                "key",
                "The web key to press (e.g., 'Enter', 'Tab', 'Escape'). Key combinations are not supported.",
            ))
            .param(
                ParamSpec::string(
                    "locate",
                    "Optional natural language description of the element to focus before pressing the key.",
                )
                .optional(),
            )
            .param(deep_think_param(
                "If true and 'locate' is provided, uses a two-step AI call to precisely locate the element.",
            ))
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            let agent = session.ensure_connected()?;
            let key = args.str("key");
            let locate = args.opt_str("locate");
            agent
                .ai_keyboard_press(key, locate, locate_options(&args))
                .await?;

            let mut text = format!("Pressed key \"{}\"", key);
            if let Some(locate) = locate {
                text.push_str(&format!(" on element described by: \"{}\"", locate));
            }
            Ok(text)
        })
    }
}

/// Handler for the `browser_ai_scroll` tool.
pub struct AiScrollHandler;

impl AiScrollHandler {
    fn wire_enum<T: DeserializeOwned>(name: &str, value: &str) -> Result<T, ToolError> {
        serde_json::from_value(Value::String(value.to_string()))
            .map_err(|e| ToolError::Internal(format!("Unhandled {}: {}", name, e)))
    }

    fn scroll_param(args: &ToolArgs) -> Result<ScrollParam, ToolError> {
        let direction: ScrollDirection = Self::wire_enum("direction", args.str("direction"))?;
        let scroll_type: ScrollType = match args.opt_str("scrollType") {
            Some(s) => Self::wire_enum("scrollType", s)?,
            None => ScrollType::default(),
        };

        Ok(ScrollParam {
            direction,
            scroll_type,
            distance: args.opt_f64("distance"),
        })
    }
}

impl ToolHandler for AiScrollHandler {
    fn name(&self) -> &str {
        "browser_ai_scroll"
    }

    fn title(&self) -> Option<&str> {
        Some("Scroll")
    }

    fn description(&self) -> &str {
        "Scrolls the page or a specified element."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .param(ParamSpec::one_of(
                "direction",
                ScrollDirection::VALUES,
                "The direction to scroll.",
            ))
            .param(
                ParamSpec::one_of(
                    "scrollType",
                    ScrollType::VALUES,
                    "Type of scroll: 'once' for a fixed distance, or until reaching an edge.",
                )
                .default_value("once"),
            )
            .param(
                ParamSpec::number(
                    "distance",
                    "The distance to scroll in pixels (used with scrollType 'once').",
                )
                .optional(),
            )
            .param(
                ParamSpec::string(
                    "locate",
                    "Optional natural language description of the element to scroll. If not provided, scrolls based on current mouse position.",
                )
                .optional(),
            )
            .param(deep_think_param(
                "If true and 'locate' is provided, uses a two-step AI call to precisely locate the element.",
            ))
    }

    fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> ToolFuture<'_> {
        let session = ctx.session.clone();
        Box::pin(async move {
            let agent = session.ensure_connected()?;
            let param = Self::scroll_param(&args)?;
            let direction = args.str("direction");
            let locate = args.opt_str("locate");
            agent
                .ai_scroll(&param, locate, locate_options(&args))
                .await?;

            Ok(match locate {
                Some(locate) => format!(
                    "Scrolled element described by: \"{}\" {}.",
                    locate, direction
                ),
                None => format!("Scrolled the page {}.", direction),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ConnectOptions;
    use crate::session::{BrowserSession, ConnectTarget};
    use crate::testing::{MockConnector, ScriptedAgent};
    use serde_json::{Value, json};

    async fn connected(agent: &ScriptedAgent) -> ToolContext {
        let session = BrowserSession::new(MockConnector::with_agent(agent.clone()).into_arc());
        session
            .connect(ConnectTarget::CurrentTab, ConnectOptions::default())
            .await
            .unwrap();
        ToolContext { session }
    }

    async fn run(handler: &dyn ToolHandler, ctx: &ToolContext, raw: Value) -> Result<String, ToolError> {
        let args = handler
            .schema()
            .validate(raw.as_object().cloned().unwrap())
            .unwrap();
        handler.execute(args, ctx).await
    }

    #[tokio::test]
    async fn test_tap_names_the_locator() {
        let agent = ScriptedAgent::new();
        let ctx = connected(&agent).await;

        let text = run(&AiTapHandler, &ctx, json!({ "locate": "Submit button" }))
            .await
            .unwrap();

        assert_eq!(text, "Tapped element described by: \"Submit button\"");
        assert_eq!(agent.calls(), vec!["ai_tap(Submit button, deep_think=false)"]);
    }

    #[tokio::test]
    async fn test_hover_forwards_deep_think() {
        let agent = ScriptedAgent::new();
        let ctx = connected(&agent).await;

        let text = run(
            &AiHoverHandler,
            &ctx,
            json!({ "locate": "the avatar", "deepThink": true }),
        )
        .await
        .unwrap();

        assert_eq!(text, "Hovered over element described by: \"the avatar\"");
        assert_eq!(agent.calls(), vec!["ai_hover(the avatar, deep_think=true)"]);
    }

    #[tokio::test]
    async fn test_input_accepts_empty_text() {
        let agent = ScriptedAgent::new();
        let ctx = connected(&agent).await;

        let text = run(
            &AiInputHandler,
            &ctx,
            json!({ "text": "", "locate": "search box" }),
        )
        .await
        .unwrap();

        assert_eq!(text, "Input \"\" into element described by: \"search box\"");
        assert_eq!(agent.calls(), vec!["ai_input(\"\", search box, deep_think=false)"]);
    }

    #[tokio::test]
    async fn test_keyboard_press_with_and_without_locator() {
        let agent = ScriptedAgent::new();
        let ctx = connected(&agent).await;

        let plain = run(&AiKeyboardPressHandler, &ctx, json!({ "key": "Escape" }))
            .await
            .unwrap();
        let focused = run(
            &AiKeyboardPressHandler,
            &ctx,
            json!({ "key": "Enter", "locate": "search box" }),
        )
        .await
        .unwrap();

        assert_eq!(plain, "Pressed key \"Escape\"");
        assert_eq!(
            focused,
            "Pressed key \"Enter\" on element described by: \"search box\""
        );
        assert_eq!(
            agent.calls(),
            vec![
                "ai_keyboard_press(Escape, None, deep_think=false)",
                "ai_keyboard_press(Enter, Some(\"search box\"), deep_think=false)",
            ]
        );
    }

    #[test]
    fn test_scroll_param_accepts_every_advertised_value() {
        let schema = AiScrollHandler.schema();
        for direction in ScrollDirection::VALUES {
            for scroll_type in ScrollType::VALUES {
                let raw = json!({ "direction": direction, "scrollType": scroll_type });
                let args = schema.validate(raw.as_object().cloned().unwrap()).unwrap();
                let param = AiScrollHandler::scroll_param(&args).unwrap();
                assert_eq!(
                    serde_json::to_value(&param).unwrap(),
                    json!({ "direction": direction, "scrollType": scroll_type })
                );
            }
        }
    }

    #[tokio::test]
    async fn test_scroll_page_defaults_to_once() {
        let agent = ScriptedAgent::new();
        let ctx = connected(&agent).await;

        let text = run(&AiScrollHandler, &ctx, json!({ "direction": "down" }))
            .await
            .unwrap();

        assert_eq!(text, "Scrolled the page down.");
        assert_eq!(
            agent.calls(),
            vec!["ai_scroll(Down, Once, None, None, deep_think=false)"]
        );
    }

    #[tokio::test]
    async fn test_scroll_element_until_edge() {
        let agent = ScriptedAgent::new();
        let ctx = connected(&agent).await;

        let text = run(
            &AiScrollHandler,
            &ctx,
            json!({ "direction": "up", "scrollType": "untilTop", "distance": 300, "locate": "the feed" }),
        )
        .await
        .unwrap();

        assert_eq!(text, "Scrolled element described by: \"the feed\" up.");
        assert_eq!(
            agent.calls(),
            vec!["ai_scroll(Up, UntilTop, Some(300.0), Some(\"the feed\"), deep_think=false)"]
        );
    }

    #[tokio::test]
    async fn test_action_failure_is_verbatim() {
        let agent = ScriptedAgent::new().failing("ai_action", "Element not found: login link");
        let ctx = connected(&agent).await;

        let err = run(&AiActionHandler, &ctx, json!({ "prompt": "log in" }))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Element not found: login link");
    }
}
