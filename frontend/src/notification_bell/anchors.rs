use super::error::WidgetError;
use async_trait::async_trait;

/// Element ids the widget hangs off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetAnchors {
    pub badge: String,
    pub popup: String,
    pub list: String,
    pub bell: String,
    /// Optional; without it the mark-all button is simply not wired.
    pub mark_all: String,
}

impl Default for WidgetAnchors {
    fn default() -> Self {
        Self {
            badge: "notification-count".to_string(),
            popup: "notification-popup".to_string(),
            list: "notification-list".to_string(),
            bell: "notification-button".to_string(),
            mark_all: "mark-all-read-btn".to_string(),
        }
    }
}

impl WidgetAnchors {
    pub fn required(&self) -> [&str; 4] {
        [&self.badge, &self.popup, &self.list, &self.bell]
    }
}

#[async_trait(?Send)]
pub trait AnchorLookup {
    async fn exists(&self, id: &str) -> bool;
}

/// Looks ids up in the live document.
pub struct DocumentAnchors;

#[async_trait(?Send)]
impl AnchorLookup for DocumentAnchors {
    async fn exists(&self, id: &str) -> bool {
        let js = format!("return document.getElementById({id:?}) !== null;");
        dioxus::document::eval(&js)
            .join::<bool>()
            .await
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedAnchors {
    pub anchors: WidgetAnchors,
    pub mark_all_present: bool,
}

/// Checks every required anchor, then the optional one.
pub async fn locate(
    anchors: &WidgetAnchors,
    lookup: &dyn AnchorLookup,
) -> Result<LocatedAnchors, WidgetError> {
    for id in anchors.required() {
        if !lookup.exists(id).await {
            return Err(WidgetError::MissingAnchor(id.to_string()));
        }
    }
    let mark_all_present = lookup.exists(&anchors.mark_all).await;
    Ok(LocatedAnchors {
        anchors: anchors.clone(),
        mark_all_present,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashSet;

    /// A document that contains exactly the given ids.
    pub struct FixedAnchors(pub HashSet<String>);

    impl FixedAnchors {
        pub fn all() -> Self {
            let a = WidgetAnchors::default();
            let mut ids: HashSet<String> = a.required().iter().map(|s| s.to_string()).collect();
            ids.insert(a.mark_all);
            Self(ids)
        }

        pub fn without(mut self, id: &str) -> Self {
            self.0.remove(id);
            self
        }
    }

    #[async_trait(?Send)]
    impl AnchorLookup for FixedAnchors {
        async fn exists(&self, id: &str) -> bool {
            self.0.contains(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FixedAnchors;
    use super::*;

    #[tokio::test]
    async fn all_present() {
        let found = locate(&WidgetAnchors::default(), &FixedAnchors::all())
            .await
            .unwrap();
        assert!(found.mark_all_present);
    }

    #[tokio::test]
    async fn mark_all_is_optional() {
        let lookup = FixedAnchors::all().without("mark-all-read-btn");
        let found = locate(&WidgetAnchors::default(), &lookup).await.unwrap();
        assert!(!found.mark_all_present);
    }

    #[tokio::test]
    async fn missing_required_anchor_is_reported() {
        let lookup = FixedAnchors::all().without("notification-list");
        let err = locate(&WidgetAnchors::default(), &lookup).await.unwrap_err();
        assert!(matches!(err, WidgetError::MissingAnchor(id) if id == "notification-list"));
    }
}
