//! Inline event-handler execution (`onerror="..."` and friends).

use boa_engine::Context;
use boa_engine::Source;

/// Properties reflected onto attributes of the element shim.
const REFLECTED_ATTRIBUTES: &[&str] = &["src", "alt", "title", "srcset", "id", "class"];

/// Element snapshot the handler runs against as `this`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerElement {
    pub tag_name: String,
    pub attributes: Vec<(String, String)>,
}

/// Runtime hardening knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRuntimeConfig {
    pub recursion_limit: usize,
    pub stack_size_limit: usize,
    pub loop_iteration_limit: u64,
}

impl Default for HandlerRuntimeConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 64,
            stack_size_limit: 1024,
            loop_iteration_limit: 100_000,
        }
    }
}

/// Per-handler execution error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub origin: String,
    pub message: String,
}

/// Attribute state of the element after the handler ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerOutcome {
    pub attributes: Vec<(String, String)>,
}

/// Runs raw handler bodies the way a browser compiles inline attributes:
/// as the body of a function taking `event`, called with the element as `this`.
#[derive(Debug, Clone, Default)]
pub struct HandlerRuntime {
    config: HandlerRuntimeConfig,
}

impl HandlerRuntime {
    pub fn new(config: HandlerRuntimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HandlerRuntimeConfig {
        &self.config
    }

    /// Each call gets a fresh context; handlers share no globals.
    pub fn run_inline_handler(
        &self,
        handler: &str,
        event_type: &str,
        element: &HandlerElement,
    ) -> Result<HandlerOutcome, ScriptError> {
        let origin = format!("inline:on{event_type}");
        let mut context = Context::default();
        context
            .runtime_limits_mut()
            .set_recursion_limit(self.config.recursion_limit);
        context
            .runtime_limits_mut()
            .set_stack_size_limit(self.config.stack_size_limit);
        context
            .runtime_limits_mut()
            .set_loop_iteration_limit(self.config.loop_iteration_limit);

        let script = build_handler_script(handler, event_type, element);
        let value = context
            .eval(Source::from_bytes(script.as_bytes()))
            .map_err(|error| ScriptError {
                origin: origin.clone(),
                message: error.to_string(),
            })?;
        let serialized = value
            .to_string(&mut context)
            .map_err(|error| ScriptError {
                origin: origin.clone(),
                message: error.to_string(),
            })?
            .to_std_string_escaped();

        let attributes: Vec<(String, String)> =
            serde_json::from_str(&serialized).map_err(|error| ScriptError {
                origin,
                message: format!("unreadable element state after handler: {error}"),
            })?;
        Ok(HandlerOutcome { attributes })
    }
}

fn build_handler_script(handler: &str, event_type: &str, element: &HandlerElement) -> String {
    let tag_name = js_string_literal(&element.tag_name.to_ascii_uppercase());
    let attributes = build_attribute_pairs(&element.attributes);
    let reflected = build_string_array(REFLECTED_ATTRIBUTES);
    let handler = js_string_literal(handler);
    let event_type = js_string_literal(event_type);

    format!(
        r##"
(function() {{
  const __jl_names = [];
  const __jl_values = Object.create(null);
  const __jl_seed = {attributes};
  for (let i = 0; i < __jl_seed.length; i += 1) {{
    const name = String(__jl_seed[i][0]).toLowerCase();
    if (!(name in __jl_values)) {{
      __jl_names.push(name);
    }}
    __jl_values[name] = String(__jl_seed[i][1]);
  }}

  const element = {{
    tagName: {tag_name},
    getAttribute: function(name) {{
      const key = String(name).toLowerCase();
      return key in __jl_values ? __jl_values[key] : null;
    }},
    hasAttribute: function(name) {{
      return String(name).toLowerCase() in __jl_values;
    }},
    setAttribute: function(name, value) {{
      const key = String(name).toLowerCase();
      if (!(key in __jl_values)) {{
        __jl_names.push(key);
      }}
      __jl_values[key] = String(value);
    }},
    removeAttribute: function(name) {{
      const key = String(name).toLowerCase();
      if (!(key in __jl_values)) {{
        return;
      }}
      delete __jl_values[key];
      __jl_names.splice(__jl_names.indexOf(key), 1);
    }}
  }};
  const __jl_reflected = {reflected};
  for (let i = 0; i < __jl_reflected.length; i += 1) {{
    const name = __jl_reflected[i];
    Object.defineProperty(element, name === "class" ? "className" : name, {{
      configurable: true,
      enumerable: true,
      get: function() {{
        const value = element.getAttribute(name);
        return value === null ? "" : value;
      }},
      set: function(value) {{
        element.setAttribute(name, value);
      }}
    }});
  }}

  const event = {{ type: {event_type}, target: element, currentTarget: element }};
  const handler = new Function("event", {handler});
  handler.call(element, event);

  const out = [];
  for (let i = 0; i < __jl_names.length; i += 1) {{
    out.push([__jl_names[i], __jl_values[__jl_names[i]]]);
  }}
  return JSON.stringify(out);
}})();
"##
    )
}

fn build_attribute_pairs(attributes: &[(String, String)]) -> String {
    let mut out = String::from("[");
    for (index, (name, value)) in attributes.iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        out.push_str(&format!(
            "[{},{}]",
            js_string_literal(name),
            js_string_literal(value)
        ));
    }
    out.push(']');
    out
}

fn build_string_array(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| js_string_literal(item)).collect();
    format!("[{}]", quoted.join(","))
}

/// JSON string syntax is valid JavaScript and never yields a legacy octal escape.
fn js_string_literal(input: &str) -> String {
    serde_json::Value::String(input.to_owned()).to_string()
}

#[cfg(test)]
mod tests {
    use super::HandlerElement;
    use super::HandlerRuntime;
    use super::HandlerRuntimeConfig;

    fn image(src: &str) -> HandlerElement {
        HandlerElement {
            tag_name: "img".to_owned(),
            attributes: vec![
                ("onerror".to_owned(), "ignored".to_owned()),
                ("alt".to_owned(), "".to_owned()),
                ("src".to_owned(), src.to_owned()),
            ],
        }
    }

    #[test]
    fn handler_can_swap_source_through_reflected_property() {
        let runtime = HandlerRuntime::default();
        let outcome = runtime
            .run_inline_handler(
                "this.onerror = null; this.src = 'fallback.png';",
                "error",
                &image("a.png"),
            )
            .expect("handler runs");
        assert_eq!(
            outcome.attributes,
            vec![
                ("onerror".to_owned(), "ignored".to_owned()),
                ("alt".to_owned(), "".to_owned()),
                ("src".to_owned(), "fallback.png".to_owned()),
            ]
        );
    }

    #[test]
    fn handler_sees_event_and_can_edit_attributes() {
        let runtime = HandlerRuntime::default();
        let outcome = runtime
            .run_inline_handler(
                "this.removeAttribute('onerror'); this.setAttribute('data-failed', event.type + ':' + this.tagName);",
                "error",
                &image("a.png"),
            )
            .expect("handler runs");
        assert_eq!(
            outcome.attributes,
            vec![
                ("alt".to_owned(), "".to_owned()),
                ("src".to_owned(), "a.png".to_owned()),
                ("data-failed".to_owned(), "error:IMG".to_owned()),
            ]
        );
    }

    #[test]
    fn syntax_errors_are_reported_not_raised() {
        let runtime = HandlerRuntime::default();
        let error = runtime
            .run_inline_handler("this.src = ;", "error", &image("a.png"))
            .expect_err("must fail");
        assert_eq!(error.origin, "inline:onerror");
        assert!(!error.message.is_empty());
    }

    #[test]
    fn runaway_handlers_hit_the_loop_limit() {
        let runtime = HandlerRuntime::new(HandlerRuntimeConfig {
            loop_iteration_limit: 1_000,
            ..HandlerRuntimeConfig::default()
        });
        assert!(
            runtime
                .run_inline_handler("while (true) {}", "error", &image("a.png"))
                .is_err()
        );
    }

    #[test]
    fn quotes_in_attribute_values_survive_the_round_trip() {
        let runtime = HandlerRuntime::default();
        let element = HandlerElement {
            tag_name: "img".to_owned(),
            attributes: vec![
                ("title".to_owned(), "say \"hi\"\n".to_owned()),
                ("alt".to_owned(), "a\u{0}1b \\0 \u{1F600}".to_owned()),
            ],
        };
        let outcome = runtime
            .run_inline_handler("", "error", &element)
            .expect("handler runs");
        assert_eq!(outcome.attributes, element.attributes);
    }
}
