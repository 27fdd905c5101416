//! Safe creative mounting.
//!
//! Script elements inserted through raw markup assignment never execute;
//! only elements created and attached through element-construction APIs
//! do. The renderer therefore turns every creative into a [`RenderPlan`]
//! of inert HTML runs and script descriptors, and the host materializes
//! the descriptors by constructing fresh script elements with attributes
//! and text copied verbatim, substituted in place.

use crate::creative::Creative;
use crate::markup::{segment_markup, ScriptDescriptor, Segment};
use crate::validator::ContentValidator;
use thiserror::Error;
use tracing::{debug, warn};

/// Host-side failure while mounting or invoking the provider hook.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HostFault(pub String);

/// Render-path errors. A rejected creative is the operator's problem to
/// fix; a host fault is an infrastructure problem. Provider hook faults
/// are neither: they are absorbed and logged.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("creative rejected: {0}")]
    Rejected(String),

    #[error("host failure: {0}")]
    Host(#[from] HostFault),
}

/// Instructions for mounting one creative into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub segments: Vec<Segment>,
    /// Invoke the provider's global push/init hook after attachment.
    pub invoke_provider_hook: bool,
}

/// Presentation-layer capability that materializes render plans.
///
/// `mount` must realize `Segment::Script` entries through element
/// construction (never markup assignment) so they execute, and must
/// attach segments in plan order.
pub trait CreativeHost: Send + Sync {
    /// Remove everything previously mounted in the container.
    fn clear(&self, container: &str);

    /// Attach the plan's segments to the container, in order.
    fn mount(&self, container: &str, plan: &RenderPlan) -> Result<(), HostFault>;

    /// Invoke the global provider push/init hook, if one is present.
    fn invoke_provider_hook(&self) -> Result<(), HostFault>;
}

/// Mounts creatives after (re-)validating them.
pub struct SafeRenderer<H: CreativeHost> {
    host: H,
    validator: ContentValidator,
}

impl<H: CreativeHost> SafeRenderer<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            validator: ContentValidator::new(),
        }
    }

    /// Render a creative into the container, replacing whatever was
    /// there. Re-renders are idempotent: only the new creative's nodes
    /// remain afterwards.
    ///
    /// Markup creatives are validated here regardless of what the caller
    /// already checked; an invalid creative leaves the container
    /// untouched.
    pub fn render(&self, container: &str, creative: &Creative) -> Result<(), RenderError> {
        let plan = self.plan(creative)?;

        self.host.clear(container);
        self.host.mount(container, &plan)?;

        if plan.invoke_provider_hook {
            // A provider-side exception must not break the host page
            if let Err(fault) = self.host.invoke_provider_hook() {
                warn!("provider init hook failed: {}", fault);
            }
        }

        debug!(
            "rendered {} creative into '{}' ({} segments)",
            creative.kind(),
            container,
            plan.segments.len()
        );
        Ok(())
    }

    /// Build the plan for a creative without touching the host.
    pub fn plan(&self, creative: &Creative) -> Result<RenderPlan, RenderError> {
        match creative {
            Creative::StaticImage { url, link_url } => Ok(RenderPlan {
                segments: vec![Segment::Html(format!(
                    r#"<a href="{}" target="_blank" rel="noopener"><img src="{}" alt=""></a>"#,
                    escape_attr(link_url),
                    escape_attr(url),
                ))],
                invoke_provider_hook: false,
            }),

            Creative::Markup { raw_html } => {
                let result = self.validator.validate(raw_html);
                if !result.valid {
                    let reason = result.reason.unwrap_or_else(|| "invalid markup".into());
                    return Err(RenderError::Rejected(reason));
                }
                Ok(RenderPlan {
                    segments: segment_markup(raw_html),
                    invoke_provider_hook: true,
                })
            }

            Creative::ProviderSlide { zone_id, format } => {
                if zone_id.is_empty() || !zone_id.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Err(RenderError::Rejected(format!(
                        "provider slide zone id must be alphanumeric, got '{}'",
                        zone_id
                    )));
                }
                let (width, height) = format.dimensions();
                Ok(RenderPlan {
                    segments: vec![
                        Segment::Script(ScriptDescriptor {
                            attributes: vec![("type".into(), "text/javascript".into())],
                            text_content: format!(
                                "atOptions = {{ 'key': '{}', 'format': 'iframe', 'height': {}, 'width': {}, 'params': {{}} }};",
                                zone_id, height, width
                            ),
                        }),
                        Segment::Script(ScriptDescriptor {
                            attributes: vec![
                                ("type".into(), "text/javascript".into()),
                                (
                                    "src".into(),
                                    format!("//www.highperformanceformat.com/{}/invoke.js", zone_id),
                                ),
                            ],
                            text_content: String::new(),
                        }),
                    ],
                    invoke_provider_hook: false,
                })
            }
        }
    }
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
