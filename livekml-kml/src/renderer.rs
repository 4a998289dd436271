//! The KML implementation of the engine's [`Renderer`].

use livekml_core::{Node, Renderer};
use livekml_types::OpKind;
use serde::{Deserialize, Serialize};

use crate::xml::{XmlError, XmlWriter};

/// The default KML 2.2 namespace.
pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Optional `<NetworkLinkControl>` elements sent with every update.
///
/// Unset fields are left out of the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkControl {
    /// `<minRefreshPeriod>`: shortest interval the viewer may poll at.
    pub min_refresh_period_secs: Option<f64>,
    /// `<maxSessionLength>`: seconds after which the viewer stops polling.
    pub max_session_length_secs: Option<f64>,
    /// `<message>`: shown by the viewer once per distinct value.
    pub message: Option<String>,
    /// `<linkName>`: replaces the NetworkLink's name.
    pub link_name: Option<String>,
    /// `<linkDescription>`: replaces the NetworkLink's description.
    pub link_description: Option<String>,
    /// `<linkSnippet>`: replaces the NetworkLink's snippet.
    pub link_snippet: Option<String>,
    /// `<linkExpires>`: ISO 8601 time after which the link is refreshed.
    pub link_expires: Option<String>,
}

/// Settings shared by the renderer and the documents built from its output.
#[derive(Debug, Clone, PartialEq)]
pub struct KmlConfig {
    /// URL of the document the viewer loaded the scene from. Every update
    /// names it as its `<targetHref>`.
    pub target_href: String,
    /// Namespace of the `<kml>` root element.
    pub namespace: String,
    /// Extra `<NetworkLinkControl>` elements.
    pub link_control: LinkControl,
}

impl KmlConfig {
    /// Config targeting `target_href` in the standard namespace.
    pub fn new(target_href: impl Into<String>) -> Self {
        Self {
            target_href: target_href.into(),
            namespace: KML_NAMESPACE.to_string(),
            link_control: LinkControl::default(),
        }
    }

    /// Builder-style setter for [`KmlConfig::link_control`].
    pub fn with_link_control(mut self, link_control: LinkControl) -> Self {
        self.link_control = link_control;
        self
    }
}

/// Renders nodes as KML update fragments.
#[derive(Debug, Clone)]
pub struct KmlRenderer {
    config: KmlConfig,
}

impl KmlRenderer {
    /// Create a renderer.
    pub fn new(config: KmlConfig) -> Self {
        Self { config }
    }

    /// The renderer's settings.
    pub fn config(&self) -> &KmlConfig {
        &self.config
    }

    /// Render a node in full: fields, embedded children and, with
    /// `with_dependents`, every displayed dependent recursively.
    ///
    /// # Errors
    ///
    /// Fails with [`XmlError::InvalidName`] when a tag or field name in the
    /// subtree is not an XML name.
    pub fn render_full(&self, node: &Node, with_dependents: bool) -> Result<String, XmlError> {
        let mut w = XmlWriter::new();
        write_node(&mut w, node, with_dependents)?;
        w.finish()
    }
}

fn write_content(w: &mut XmlWriter, node: &Node) -> Result<(), XmlError> {
    for (name, value) in node.fields() {
        w.text_element(name, value)?;
    }
    for child in node.embedded_children() {
        write_node(w, child, false)?;
    }
    Ok(())
}

fn write_node(w: &mut XmlWriter, node: &Node, with_dependents: bool) -> Result<(), XmlError> {
    let id = node.id().to_string();
    w.open(node.tag(), &[("id", id.as_str())])?;
    write_content(w, node)?;
    if with_dependents {
        for dependent in node.active_dependents() {
            write_node(w, dependent, true)?;
        }
    }
    w.close(node.tag())?;
    Ok(())
}

/// Run `write` on a fresh writer. The coordinator rejects unrenderable
/// names before a cycle starts, so a failure here means the renderer was
/// called directly; the entry is left empty.
fn fragment(
    kind: OpKind,
    node: &Node,
    write: impl FnOnce(&mut XmlWriter) -> Result<(), XmlError>,
) -> String {
    let mut w = XmlWriter::new();
    write(&mut w)
        .and_then(|()| w.finish())
        .unwrap_or_else(|error| {
            tracing::warn!(%kind, id = %node.id(), %error, "node cannot be rendered");
            String::new()
        })
}

impl Renderer for KmlRenderer {
    type Fragment = String;

    fn render_create(&self, node: &Node, parent: &Node) -> String {
        fragment(OpKind::Create, node, |w| {
            let target = parent.id().to_string();
            w.open(parent.tag(), &[("targetId", target.as_str())])?;
            write_node(w, node, false)?;
            w.close(parent.tag())?;
            Ok(())
        })
    }

    fn render_change(&self, node: &Node) -> String {
        fragment(OpKind::Change, node, |w| {
            let target = node.id().to_string();
            w.open(node.tag(), &[("targetId", target.as_str())])?;
            write_content(w, node)?;
            w.close(node.tag())?;
            Ok(())
        })
    }

    fn render_delete(&self, node: &Node) -> String {
        fragment(OpKind::Delete, node, |w| {
            let target = node.id().to_string();
            w.empty(node.tag(), &[("targetId", target.as_str())])?;
            Ok(())
        })
    }
}
