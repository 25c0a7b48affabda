//! Conditional edges: route to the next node from the post-merge state.
//!
//! A router is a function `(state) -> label` plus the set of labels it declares
//! it can return. Each label maps to a node id or `END`, either through an
//! explicit path map or, without one, by using the label itself as the target.
//! The declaration lets `compile` reject a router whose labels are not all
//! mapped.

use std::collections::HashMap;
use std::sync::Arc;

/// Router function: state in, routing label out.
pub type RouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Conditional edge: routing function, declared labels, optional path map.
///
/// **Interaction**: stored by `StateGraph::add_conditional_edges`, validated in
/// `compile`, resolved by the run loop after the source node's patch is merged.
pub struct ConditionalRouter<S> {
    path: RouterFn<S>,
    labels: Vec<String>,
    path_map: Option<HashMap<String, String>>,
}

impl<S> Clone for ConditionalRouter<S> {
    fn clone(&self) -> Self {
        Self {
            path: Arc::clone(&self.path),
            labels: self.labels.clone(),
            path_map: self.path_map.clone(),
        }
    }
}

impl<S> ConditionalRouter<S> {
    pub fn new(
        path: RouterFn<S>,
        labels: Vec<String>,
        path_map: Option<HashMap<String, String>>,
    ) -> Self {
        Self {
            path,
            labels,
            path_map,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Target for a label: `path_map[label]`, or the label itself without a map.
    pub fn target_for<'a>(&'a self, label: &'a str) -> Option<&'a str> {
        match &self.path_map {
            Some(map) => map.get(label).map(String::as_str),
            None => Some(label),
        }
    }

    /// Every target this router can send to, in label order.
    pub fn targets(&self) -> impl Iterator<Item = &str> + '_ {
        self.labels.iter().filter_map(|l| self.target_for(l))
    }

    /// Runs the router. `Ok((label, target))`, or `Err(label)` when the label
    /// was not declared.
    pub fn resolve_next(&self, state: &S) -> Result<(String, String), String> {
        let label = (self.path)(state);
        if !self.labels.iter().any(|l| l == &label) {
            return Err(label);
        }
        match self.target_for(&label) {
            Some(target) => {
                let target = target.to_string();
                Ok((label, target))
            }
            None => Err(label),
        }
    }
}

/// How the node after a given node is chosen.
pub enum NextEntry<S> {
    /// Fixed next node (or END).
    Unconditional(String),
    /// Decided by the router from the post-merge state.
    Conditional(ConditionalRouter<S>),
}

impl<S> Clone for NextEntry<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Unconditional(to) => Self::Unconditional(to.clone()),
            Self::Conditional(router) => Self::Conditional(router.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parity_router(map: Option<HashMap<String, String>>) -> ConditionalRouter<i32> {
        ConditionalRouter::new(
            Arc::new(|s: &i32| if s % 2 == 0 { "even".into() } else { "odd".into() }),
            vec!["even".into(), "odd".into()],
            map,
        )
    }

    /// **Scenario**: With a path map the label is translated to its target.
    #[test]
    fn resolve_next_uses_path_map() {
        let map = [("even".into(), "halve".into()), ("odd".into(), "__end__".into())]
            .into_iter()
            .collect();
        let r = parity_router(Some(map));
        assert_eq!(r.resolve_next(&4), Ok(("even".into(), "halve".into())));
        assert_eq!(r.resolve_next(&3), Ok(("odd".into(), "__end__".into())));
    }

    /// **Scenario**: Without a path map the label is the target.
    #[test]
    fn resolve_next_without_map_uses_label() {
        let r = parity_router(None);
        assert_eq!(r.resolve_next(&1), Ok(("odd".into(), "odd".into())));
        assert_eq!(r.targets().collect::<Vec<_>>(), vec!["even", "odd"]);
    }

    /// **Scenario**: Without a path map a caller-owned label is returned as its own target.
    #[test]
    fn target_for_borrows_caller_label() {
        let r = parity_router(None);
        let label = String::from("odd");
        assert_eq!(r.target_for(&label), Some("odd"));
        let mapped = parity_router(Some([("odd".into(), "halve".into())].into_iter().collect()));
        assert_eq!(mapped.target_for(&label), Some("halve"));
        assert_eq!(mapped.target_for("even"), None);
    }

    /// **Scenario**: A label the router did not declare is reported back as Err.
    #[test]
    fn undeclared_label_is_rejected() {
        let r = ConditionalRouter::new(
            Arc::new(|_: &i32| "surprise".to_string()),
            vec!["known".into()],
            None,
        );
        assert_eq!(r.resolve_next(&0), Err("surprise".to_string()));
    }
}
