//! Aspect advice
//!
//! `before`, `after` and `around` produce decorators that wrap whatever the
//! destination currently holds under the member name. Each piece of advice is
//! a [`Layer`]; an advised member remembers the undecorated procedure it grew
//! from (its root) together with the ordered layers applied on top, as a
//! [`Weave`].
//!
//! Re-installing an advised member on a destination stacks only the layers the
//! destination does not already carry, so every layer appears once. Two
//! branches of a diamond that each advise the same inherited member therefore
//! combine into one stack over a single root, and the shared root runs once
//! per call.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use mosaic_core::{Function, Install, InstallHook, Result, Value};

type WeaveFn = dyn Fn(Option<Function>) -> Function + Send + Sync;

/// One piece of advice: builds the advised procedure from the procedure it
/// wraps (absent when there is nothing to wrap).
#[derive(Clone)]
pub struct Layer(Arc<WeaveFn>);

impl Layer {
    /// Wrap a weave closure
    pub fn new<F>(weave: F) -> Self
    where
        F: Fn(Option<Function>) -> Function + Send + Sync + 'static,
    {
        Self(Arc::new(weave))
    }

    /// Apply this advice over `base`
    pub fn weave(&self, base: Option<Function>) -> Function {
        (self.0)(base)
    }

    fn ptr_eq(&self, other: &Layer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Layer({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Root procedure plus the advice applied over it, innermost first.
#[derive(Debug, Clone, Default)]
pub struct Weave {
    root: Option<Function>,
    layers: Vec<Layer>,
}

impl Weave {
    /// Single piece of advice over nothing
    pub fn layer(layer: Layer) -> Self {
        Self {
            root: None,
            layers: vec![layer],
        }
    }

    /// Undecorated procedure the advice wraps
    pub fn root(&self) -> Option<&Function> {
        self.root.as_ref()
    }

    /// Number of advice layers
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Weave carried by a member value; a plain procedure is a bare root.
    pub fn of(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Function(function)) => match function.meta::<Weave>() {
                Some(weave) => weave.clone(),
                None => Self {
                    root: Some(function.clone()),
                    layers: Vec::new(),
                },
            },
            _ => Self::default(),
        }
    }

    /// Put the layers of `incoming` that `self` lacks on top of `self`, in
    /// their original order.
    ///
    /// The destination's root is kept: advice grown over an unrelated root
    /// wraps what the destination already holds. Only a required placeholder
    /// gives way to the incoming root.
    pub fn stack(&self, incoming: &Weave) -> Weave {
        let root = match (&self.root, &incoming.root) {
            (Some(current), Some(other)) if current.is_required() => Some(other.clone()),
            (Some(current), Some(other)) if !current.ptr_eq(other) => {
                tracing::debug!(
                    current = ?current,
                    dropped = ?other,
                    "advice woven over an unrelated definition"
                );
                Some(current.clone())
            }
            (current, other) => current.clone().or_else(|| other.clone()),
        };
        let mut layers = self.layers.clone();
        for layer in &incoming.layers {
            if !layers.iter().any(|existing| existing.ptr_eq(layer)) {
                layers.push(layer.clone());
            }
        }
        Weave { root, layers }
    }

    /// Advised procedure, tagged so it can be installed again.
    pub fn build(&self) -> Option<Function> {
        let mut woven = self.root.clone();
        for layer in &self.layers {
            woven = Some(layer.weave(woven));
        }
        let woven = woven?;
        Some(
            woven
                .with_meta(Arc::new(self.clone()))
                .with_install(self.install_hook()),
        )
    }

    fn install_hook(&self) -> InstallHook {
        let weave = self.clone();
        InstallHook::new(move |install| weave.install(install))
    }

    fn install(&self, install: &Install<'_>) -> Result<()> {
        let target = install.target();
        let name = install.name();
        let current = Weave::of(target.data_value(name).as_ref());
        let stacked = current.stack(self);
        tracing::debug!(member = name, depth = stacked.depth(), "weaving advice");
        match stacked.build() {
            Some(advised) => target.set(name, advised),
            None => Ok(()),
        }
    }
}

/// Decorator for a single piece of advice.
///
/// Called directly, it behaves as the advice applied over nothing.
fn advice_decorator(layer: Layer) -> Function {
    let weave = Weave::layer(layer.clone());
    let standalone = Arc::new(OnceCell::new());
    let direct = Function::new(move |this, args| {
        standalone
            .get_or_init(|| layer.weave(None))
            .call(this, args)
    });
    Function::decorator(weave.install_hook(), Some(direct)).with_meta(Arc::new(weave))
}

/// Build an advice factory from `handler(base, advice)`.
///
/// The returned factory turns an advice value into a decorator that, once
/// installed under a name, replaces the member with `handler(existing, advice)`.
pub fn aspect<A, H>(handler: H) -> impl Fn(A) -> Function
where
    A: Send + Sync + 'static,
    H: Fn(Option<Function>, &A) -> Function + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    move |advice: A| {
        let handler = handler.clone();
        let advice = Arc::new(advice);
        advice_decorator(Layer::new(move |base| handler(base, &advice)))
    }
}

/// Result of `before` advice
#[derive(Debug, Clone, PartialEq)]
pub enum BeforeOutcome {
    /// Call the wrapped procedure with the original arguments
    Continue,
    /// Call the wrapped procedure with these arguments instead
    ReplaceArgs(Vec<Value>),
    /// Return without calling the wrapped procedure
    Stop,
}

/// Run `advice` first; it may replace the arguments or stop the call.
pub fn before<F>(advice: F) -> Function
where
    F: Fn(&Value, &[Value]) -> Result<BeforeOutcome> + Send + Sync + 'static,
{
    aspect(|base: Option<Function>, advice: &Arc<F>| {
        let advice = advice.clone();
        Function::named("before", move |this, args| {
            let replaced;
            let args = match advice(this, args)? {
                BeforeOutcome::Stop => return Ok(Value::Undefined),
                BeforeOutcome::Continue => args,
                BeforeOutcome::ReplaceArgs(new_args) => {
                    replaced = new_args;
                    &replaced[..]
                }
            };
            match &base {
                Some(base) => base.call(this, args),
                None => Ok(Value::Undefined),
            }
        })
    })(Arc::new(advice))
}

/// Run the wrapped procedure, then `advice` with the same arguments.
///
/// The advice's result wins unless it is `Undefined`.
pub fn after<F>(advice: F) -> Function
where
    F: Fn(&Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
{
    let advice = Function::named("after", advice);
    aspect(|base: Option<Function>, advice: &Function| match base {
        None => advice.clone(),
        Some(base) => {
            let advice = advice.clone();
            Function::named("after", move |this, args| {
                let result = base.call(this, args)?;
                let advised = advice.call(this, args)?;
                Ok(if advised.is_undefined() { result } else { advised })
            })
        }
    })(advice)
}

/// Replace the member with `advice(existing)`; the advice decides whether,
/// when and how the existing procedure runs.
pub fn around<F>(advice: F) -> Function
where
    F: Fn(Option<Function>) -> Function + Send + Sync + 'static,
{
    aspect(|base: Option<Function>, advice: &F| advice(base))(advice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_core::{ComposeError, ObjectRef};

    fn install(decorator: &Function, target: &ObjectRef, name: &str) {
        decorator
            .install_hook()
            .unwrap()
            .run(target, name)
            .unwrap();
    }

    #[test]
    fn test_after_wraps_existing() {
        let target = ObjectRef::from_entries([(
            "foo",
            Function::new(|_, _| Ok(Value::from("base"))),
        )]);
        install(&after(|_, _| Ok(Value::Undefined)), &target, "foo");
        assert_eq!(target.invoke("foo", &[]).unwrap(), Value::from("base"));

        install(&after(|_, _| Ok(Value::from("advice"))), &target, "foo");
        assert_eq!(target.invoke("foo", &[]).unwrap(), Value::from("advice"));
    }

    #[test]
    fn test_before_stop_skips_base() {
        let target = ObjectRef::from_entries([(
            "foo",
            Function::new(|_, _| Err(ComposeError::thrown("base ran"))),
        )]);
        install(&before(|_, _| Ok(BeforeOutcome::Stop)), &target, "foo");
        assert_eq!(target.invoke("foo", &[]).unwrap(), Value::Undefined);
    }

    #[test]
    fn test_before_replaces_arguments() {
        let target = ObjectRef::from_entries([(
            "echo",
            Function::new(|_, args| Ok(args.first().cloned().unwrap_or_default())),
        )]);
        install(
            &before(|_, _| Ok(BeforeOutcome::ReplaceArgs(vec![Value::from(3)]))),
            &target,
            "echo",
        );
        assert_eq!(target.invoke("echo", &[Value::from(1)]).unwrap(), Value::from(3));
    }

    #[test]
    fn test_around_without_base_receives_none() {
        let target = ObjectRef::new();
        install(
            &around(|base| {
                let had_base = base.is_some();
                Function::new(move |_, _| Ok(Value::from(had_base)))
            }),
            &target,
            "foo",
        );
        assert_eq!(target.invoke("foo", &[]).unwrap(), Value::from(false));
    }

    #[test]
    fn test_unapplied_advice_called_directly() {
        let advice = after(|_, _| Ok(Value::from("alone")));
        assert_eq!(advice.call(&Value::Undefined, &[]).unwrap(), Value::from("alone"));
    }

    #[test]
    fn test_reinstall_skips_shared_layers() {
        let root = Function::new(|_, _| Ok(Value::Undefined));
        let first = Layer::new(|base| base.unwrap_or_else(|| Function::new(|_, _| Ok(Value::Undefined))));
        let second = Layer::new(|base| base.unwrap_or_else(|| Function::new(|_, _| Ok(Value::Undefined))));

        let current = Weave {
            root: Some(root.clone()),
            layers: vec![first.clone()],
        };
        let incoming = Weave {
            root: Some(root.clone()),
            layers: vec![first, second],
        };
        let stacked = current.stack(&incoming);
        assert_eq!(stacked.depth(), 2);
        assert!(stacked.root().unwrap().ptr_eq(&root));
    }

    #[test]
    fn test_stack_unions_reordered_layers() {
        let passthrough = || {
            Layer::new(|base| base.unwrap_or_else(|| Function::new(|_, _| Ok(Value::Undefined))))
        };
        let (shared, a, b) = (passthrough(), passthrough(), passthrough());
        let current = Weave {
            root: None,
            layers: vec![shared.clone(), a.clone(), b.clone()],
        };
        let incoming = Weave {
            root: None,
            layers: vec![shared, b, a],
        };
        assert_eq!(current.stack(&incoming).depth(), 3);
    }

    #[test]
    fn test_stack_over_different_root_wraps_current() {
        let current_root = Function::new(|_, _| Ok(Value::Undefined));
        let current = Weave::of(Some(&Value::from(current_root.clone())));
        let layer = Layer::new(|base| base.unwrap_or_else(|| Function::new(|_, _| Ok(Value::Undefined))));
        let incoming = Weave {
            root: Some(Function::new(|_, _| Ok(Value::Undefined))),
            layers: vec![layer],
        };
        let stacked = current.stack(&incoming);
        assert!(stacked.root().unwrap().ptr_eq(&current_root));
        assert_eq!(stacked.depth(), 1);
    }

    #[test]
    fn test_required_root_gives_way() {
        let current = Weave::of(Some(&Value::from(Function::required())));
        let other_root = Function::new(|_, _| Ok(Value::Undefined));
        let incoming = Weave {
            root: Some(other_root.clone()),
            layers: Vec::new(),
        };
        assert!(current.stack(&incoming).root().unwrap().ptr_eq(&other_root));
    }
}
