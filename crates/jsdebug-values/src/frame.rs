use std::sync::{Arc, Weak};

use jsdebug_protocol::{CallFrameId, FrameDescription, RefOrValue, SourceLocation};

use crate::error::{Blocking, ValueResult};
use crate::loader::ValueLoader;
use crate::scope::{Scope, ScopeType};
use crate::value::{upgrade, JsValue, ScopeObject, Variable};

/// Entry of [`CallFrame::variables`].
#[derive(Debug, Clone)]
pub enum FrameVariable {
    Variable(Variable),
    /// The global scope, shown as one expandable entry.
    Scope(ScopeObject),
}

impl FrameVariable {
    pub fn name(&self) -> String {
        match self {
            FrameVariable::Variable(variable) => variable.name(),
            FrameVariable::Scope(scope) => scope.name(),
        }
    }

    pub fn value(&self) -> JsValue {
        match self {
            FrameVariable::Variable(variable) => variable.value(),
            FrameVariable::Scope(scope) => JsValue::ScopeObject(scope.clone()),
        }
    }

    pub fn is_mutable(&self) -> bool {
        match self {
            FrameVariable::Variable(variable) => variable.is_mutable(),
            FrameVariable::Scope(scope) => scope.is_mutable(),
        }
    }
}

#[derive(Debug)]
struct FrameInner {
    id: CallFrameId,
    function_name: String,
    location: Option<SourceLocation>,
    receiver: RefOrValue,
    scopes: Vec<Scope>,
    loader: Weak<ValueLoader>,
}

/// One frame of a paused stack. Valid until the debuggee resumes.
#[derive(Debug, Clone)]
pub struct CallFrame {
    inner: Arc<FrameInner>,
}

impl CallFrame {
    pub fn new(description: &FrameDescription, loader: Weak<ValueLoader>) -> ValueResult<Self> {
        let receiver = description.receiver.resolve()?;
        let scopes = description
            .scopes
            .iter()
            .map(|scope| Scope::new(description.id, scope, loader.clone()))
            .collect();
        Ok(Self {
            inner: Arc::new(FrameInner {
                id: description.id,
                function_name: description.function_name.clone(),
                location: description.location,
                receiver,
                scopes,
                loader,
            }),
        })
    }

    pub fn id(&self) -> CallFrameId {
        self.inner.id
    }

    pub fn function_name(&self) -> &str {
        &self.inner.function_name
    }

    pub fn source_location(&self) -> Option<SourceLocation> {
        self.inner.location
    }

    /// 1-based line for display.
    pub fn display_line(&self) -> Option<u32> {
        self.inner.location.map(|location| location.line + 1)
    }

    /// Innermost first.
    pub fn scopes(&self) -> &[Scope] {
        &self.inner.scopes
    }

    pub fn has_variables(&self) -> bool {
        !self.inner.scopes.is_empty()
    }

    /// The `this` value of the frame.
    pub fn receiver(&self) -> Blocking<JsValue> {
        let loader = upgrade(&self.inner.loader)?;
        let mirror = loader.get_or_load_value(&self.inner.receiver)?;
        Ok(JsValue::from_mirror(mirror, loader.weak()))
    }

    /// Every scope's variables in one list, outermost first; the global scope
    /// contributes a single scope entry instead of its members.
    pub fn variables(&self) -> Blocking<Vec<FrameVariable>> {
        let mut out = Vec::new();
        for scope in &self.inner.scopes {
            if scope.scope_type() == ScopeType::Global {
                out.push(FrameVariable::Scope(scope.as_scope_object()));
            } else {
                out.extend(scope.variables()?.iter().cloned().map(FrameVariable::Variable));
            }
        }
        out.reverse();
        Ok(out)
    }
}
