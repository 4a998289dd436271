//! Complete KML documents served to a viewer.
//!
//! Three documents make up a live scene:
//! - the **loader**, a Folder of two NetworkLinks the user opens once
//! - the **elements** document, the whole scene as it stands
//! - the **update** document, one `<NetworkLinkControl>` per poll

use livekml_core::{Node, OperationBatch};
use livekml_types::{CycleId, OpKind};

use crate::renderer::{KmlRenderer, LinkControl, KML_NAMESPACE};
use crate::xml::{Result, XmlWriter};

/// HTTP content type for every KML document.
pub const KML_CONTENT_TYPE: &str = "application/vnd.google-earth.kml+xml";

fn document(namespace: &str, body: impl FnOnce(&mut XmlWriter) -> Result<()>) -> Result<String> {
    let mut w = XmlWriter::new();
    w.declaration()?.raw("\n")?;
    w.open("kml", &[("xmlns", namespace)])?;
    body(&mut w)?;
    w.close("kml")?;
    w.finish()
}

/// The cookie a viewer echoes back on its next poll, as a query string.
pub fn cycle_cookie(cycle: CycleId) -> String {
    format!("cycle={}", cycle.value())
}

fn optional(w: &mut XmlWriter, name: &str, value: Option<&str>) -> Result<()> {
    if let Some(value) = value {
        w.text_element(name, value)?;
    }
    Ok(())
}

/// The `<NetworkLinkControl>` children that precede `<Update>`, in schema
/// order.
fn write_link_control(w: &mut XmlWriter, control: &LinkControl, cookie: Option<&str>) -> Result<()> {
    let min_refresh = control.min_refresh_period_secs.map(|s| s.to_string());
    let max_session = control.max_session_length_secs.map(|s| s.to_string());
    optional(w, "minRefreshPeriod", min_refresh.as_deref())?;
    optional(w, "maxSessionLength", max_session.as_deref())?;
    optional(w, "cookie", cookie)?;
    optional(w, "message", control.message.as_deref())?;
    optional(w, "linkName", control.link_name.as_deref())?;
    optional(w, "linkDescription", control.link_description.as_deref())?;
    optional(w, "linkSnippet", control.link_snippet.as_deref())?;
    optional(w, "linkExpires", control.link_expires.as_deref())
}

impl KmlRenderer {
    /// Wrap a rendered batch in an update document.
    ///
    /// Entries keep their batch order: each run of consecutive entries of
    /// the same kind becomes one `<Create>`, `<Change>` or `<Delete>`
    /// section. An empty batch yields an `<Update>` with no sections.
    pub fn update_document(
        &self,
        batch: &OperationBatch<String>,
        cookie: Option<&str>,
    ) -> Result<String> {
        let config = self.config();
        document(&config.namespace, |w| {
            w.open("NetworkLinkControl", &[])?;
            write_link_control(w, &config.link_control, cookie)?;
            w.open("Update", &[])?;
            w.text_element("targetHref", &config.target_href)?;

            let mut section: Option<OpKind> = None;
            for entry in batch {
                if section != Some(entry.kind) {
                    if let Some(open) = section {
                        w.close(open.section_tag())?;
                    }
                    w.open(entry.kind.section_tag(), &[])?;
                    section = Some(entry.kind);
                }
                w.raw(&entry.fragment)?;
            }
            if let Some(open) = section {
                w.close(open.section_tag())?;
            }

            w.close("Update")?;
            w.close("NetworkLinkControl")?;
            Ok(())
        })
    }

    /// The whole displayed scene under `root`, for the initial fetch.
    ///
    /// Run the coordinator's initial cycle first so that every node in the
    /// document is recorded as delivered.
    pub fn elements_document(&self, root: &Node) -> Result<String> {
        let scene = self.render_full(root, true)?;
        document(&self.config().namespace, |w| {
            w.raw(&scene)?;
            Ok(())
        })
    }
}

/// The entry point a user opens in the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderDocument {
    /// Name of the enclosing Folder.
    pub name: String,
    /// URL of the elements document, fetched once.
    pub elements_href: String,
    /// URL of the update document, polled on an interval.
    pub update_href: String,
    /// Seconds between polls.
    pub refresh_interval_secs: f64,
}

impl LoaderDocument {
    /// Render the loader.
    pub fn render(&self) -> Result<String> {
        let interval = self.refresh_interval_secs.to_string();
        document(KML_NAMESPACE, |w| {
            w.open("Folder", &[])?
                .text_element("name", &self.name)?
                .text_element("open", "1")?;

            w.open("NetworkLink", &[])?
                .text_element("name", "Elements")?
                .text_element("open", "1")?
                .open("Link", &[])?
                .text_element("href", &self.elements_href)?
                .close("Link")?
                .close("NetworkLink")?;

            w.open("NetworkLink", &[])?
                .text_element("name", "Update")?
                .open("Link", &[])?
                .text_element("href", &self.update_href)?
                .text_element("refreshMode", "onInterval")?
                .text_element("refreshInterval", &interval)?
                .close("Link")?
                .close("NetworkLink")?;

            w.close("Folder")?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::KmlConfig;
    use livekml_core::{BatchEntry, CoordinatorConfig, SyncCoordinator};
    use livekml_types::NodeId;

    const HREF: &str = "http://localhost:5000/elements.kml";

    fn renderer() -> KmlRenderer {
        KmlRenderer::new(KmlConfig::new(HREF))
    }

    fn entry(kind: OpKind, fragment: &str) -> BatchEntry<String> {
        BatchEntry {
            kind,
            id: NodeId::new(),
            parent: None,
            fragment: fragment.to_string(),
        }
    }

    #[test]
    fn update_groups_runs_in_batch_order() {
        let batch = OperationBatch::new(
            CycleId::new(4),
            vec![
                entry(OpKind::Delete, "<a/>"),
                entry(OpKind::Create, "<b/>"),
                entry(OpKind::Create, "<c/>"),
                entry(OpKind::Change, "<d/>"),
            ],
        );

        let kml = renderer()
            .update_document(&batch, Some(cycle_cookie(batch.cycle()).as_str()))
            .unwrap();

        assert!(kml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<kml"));
        assert!(kml.contains(
            "<NetworkLinkControl><cookie>cycle=4</cookie><Update>\
             <targetHref>http://localhost:5000/elements.kml</targetHref>\
             <Delete><a/></Delete><Create><b/><c/></Create><Change><d/></Change>\
             </Update></NetworkLinkControl>"
        ));
    }

    #[test]
    fn empty_update_has_no_sections() {
        let batch = OperationBatch::<String>::new(CycleId::zero(), Vec::new());
        let kml = renderer().update_document(&batch, None).unwrap();
        assert!(kml.contains(&format!("<Update><targetHref>{HREF}</targetHref></Update>")));
        assert!(!kml.contains("cookie"));
    }

    #[test]
    fn cycle_through_coordinator_renders_valid_update() {
        let mut root = Node::container("Document");
        let root_id = root.id();
        root.add_dependent(Node::leaf("Placemark").with_field("name", "A"))
            .unwrap();
        let mut sync = SyncCoordinator::new(renderer(), CoordinatorConfig::default());
        sync.run_initial(&mut root).unwrap();

        let a = root.dependents()[0].id();
        root.dependent_mut(a).unwrap().activate(true, false);
        let batch = sync.run_cycle(&mut root).unwrap();
        let kml = sync.renderer().update_document(&batch, None).unwrap();

        assert!(kml.contains(&format!(
            "<Create><Document targetId=\"{root_id}\"><Placemark id=\"{a}\"><name>A</name></Placemark></Document></Create>"
        )));
    }

    #[test]
    fn elements_document_contains_scene() {
        let mut root = Node::container("Document").with_field("name", "Root");
        root.add_dependent(Node::leaf("Placemark").with_field("name", "A"))
            .unwrap();
        root.activate(true, true);
        let mut sync = SyncCoordinator::new(renderer(), CoordinatorConfig::default());
        sync.run_initial(&mut root).unwrap();

        let kml = sync.renderer().elements_document(&root).unwrap();
        assert!(kml.contains(&format!(
            "<kml xmlns=\"{KML_NAMESPACE}\"><Document id=\"{}\"><name>Root</name><Placemark",
            root.id()
        )));
        assert!(kml.ends_with("</Placemark></Document></kml>"));
    }

    #[test]
    fn loader_links_elements_and_update() {
        let loader = LoaderDocument {
            name: "Live".to_string(),
            elements_href: HREF.to_string(),
            update_href: "http://localhost:5000/update.kml".to_string(),
            refresh_interval_secs: 0.5,
        };
        let kml = loader.render().unwrap();
        assert!(kml.contains("<Folder><name>Live</name><open>1</open>"));
        assert!(kml.contains(&format!("<Link><href>{HREF}</href></Link>")));
        assert!(kml.contains(
            "<href>http://localhost:5000/update.kml</href>\
             <refreshMode>onInterval</refreshMode><refreshInterval>0.5</refreshInterval>"
        ));
    }

    #[test]
    fn link_control_elements_precede_update_in_schema_order() {
        let control = LinkControl {
            min_refresh_period_secs: Some(0.25),
            max_session_length_secs: Some(3600.0),
            message: Some("Tracking <live>".to_string()),
            link_name: Some("Aircraft".to_string()),
            link_description: None,
            link_snippet: Some("updated every second".to_string()),
            link_expires: Some("2026-01-01T00:00:00Z".to_string()),
        };
        let renderer = KmlRenderer::new(KmlConfig::new(HREF).with_link_control(control));
        let batch = OperationBatch::<String>::new(CycleId::new(2), Vec::new());

        let kml = renderer.update_document(&batch, Some("cycle=2")).unwrap();

        assert!(kml.contains(
            "<NetworkLinkControl><minRefreshPeriod>0.25</minRefreshPeriod>\
             <maxSessionLength>3600</maxSessionLength><cookie>cycle=2</cookie>\
             <message>Tracking &lt;live&gt;</message><linkName>Aircraft</linkName>\
             <linkSnippet>updated every second</linkSnippet>\
             <linkExpires>2026-01-01T00:00:00Z</linkExpires><Update>"
        ));
        assert!(!kml.contains("linkDescription"));
    }

    #[test]
    fn default_link_control_adds_nothing() {
        let batch = OperationBatch::<String>::new(CycleId::zero(), Vec::new());
        let kml = renderer().update_document(&batch, None).unwrap();
        assert!(kml.contains("<NetworkLinkControl><Update>"));
    }

    #[test]
    fn elements_document_fails_on_unrenderable_scene() {
        let root = Node::container("Document").with_field("bad name", "x");
        assert!(renderer().elements_document(&root).is_err());
    }
}
