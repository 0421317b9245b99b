//! Dynamic, named per-element properties.
//!
//! Algorithms attach scratch data (sizing fields, locked flags, feature flags,
//! visited markers) to mesh elements without touching [`HalfEdgeMesh`]
//! itself. Each property is a dense array stored behind the type-erased
//! [`PropertyArray`] trait inside a [`PropertyContainer`]; there is one
//! container per element kind plus a model-level bag with a single entry.
//!
//! Growing an element array grows every property of that kind in lockstep,
//! and garbage collection permutes them together with the connectivity.
//!
//! ```
//! use halfmesh::prelude::*;
//! use nalgebra::Point3;
//!
//! let mut mesh = HalfEdgeMesh::new();
//! let v = mesh.add_vertex(Point3::origin());
//!
//! let weight = mesh.add_vertex_property("v:weight", 1.0_f64).unwrap();
//! mesh.vertex_property_mut(weight)[v] = 4.0;
//! assert_eq!(mesh.vertex_property(weight)[v], 4.0);
//!
//! // Lookup by name is typed: the wrong type yields `None`.
//! assert!(mesh.get_vertex_property::<f64>("v:weight").is_some());
//! assert!(mesh.get_vertex_property::<bool>("v:weight").is_none());
//! ```
//!
//! [`HalfEdgeMesh`]: super::HalfEdgeMesh

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use super::index::{EdgeId, FaceId, HalfEdgeId, VertexId};
use crate::error::{MeshError, Result};

/// Keys that address an entry of a property array.
pub trait PropertyKey: Copy + Send + Sync + 'static {
    /// Position of the keyed element inside the dense array.
    fn slot(self) -> usize;
}

impl PropertyKey for VertexId {
    #[inline]
    fn slot(self) -> usize {
        self.index()
    }
}

impl PropertyKey for HalfEdgeId {
    #[inline]
    fn slot(self) -> usize {
        self.index()
    }
}

impl PropertyKey for EdgeId {
    #[inline]
    fn slot(self) -> usize {
        self.index()
    }
}

impl PropertyKey for FaceId {
    #[inline]
    fn slot(self) -> usize {
        self.index()
    }
}

/// Key of the model-level property bag, which always holds one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Model;

impl PropertyKey for Model {
    #[inline]
    fn slot(self) -> usize {
        0
    }
}

/// Type-erased interface over a resizable property array.
pub trait PropertyArray: Any + Send + Sync {
    /// Name the property was registered under.
    fn name(&self) -> &str;
    /// Number of entries.
    fn len(&self) -> usize;
    /// Whether the array has no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Reserve room for `additional` more entries.
    fn reserve(&mut self, additional: usize);
    /// Resize to `n` entries, filling with the default value.
    fn resize(&mut self, n: usize);
    /// Append one default entry.
    fn push(&mut self);
    /// Swap two entries.
    fn swap(&mut self, i: usize, j: usize);
    /// Overwrite entry `to` with a copy of entry `from`.
    fn copy(&mut self, from: usize, to: usize);
    /// Release unused capacity.
    fn shrink_to_fit(&mut self);
    /// Deep copy.
    fn clone_box(&self) -> Box<dyn PropertyArray>;
    /// Name of the stored value type.
    fn type_name(&self) -> &'static str;
    /// Upcast for downcasting to the concrete array.
    fn as_any(&self) -> &dyn Any;
    /// Mutable upcast for downcasting to the concrete array.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A named, typed dense array indexed by element handles.
pub struct PropertyVec<K, T> {
    name: String,
    data: Vec<T>,
    default: T,
    _marker: PhantomData<fn(K)>,
}

impl<K: PropertyKey, T: Clone> PropertyVec<K, T> {
    fn new(name: &str, default: T, len: usize) -> Self {
        Self {
            name: name.to_string(),
            data: vec![default.clone(); len],
            default,
            _marker: PhantomData,
        }
    }

    /// Name of the property.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value given to newly created elements.
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Number of entries (equals the element array size).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All entries as a slice, indexed by raw element index.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// All entries as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Set every entry to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }
}

impl<K: PropertyKey, T> Index<K> for PropertyVec<K, T> {
    type Output = T;

    #[inline]
    fn index(&self, key: K) -> &T {
        &self.data[key.slot()]
    }
}

impl<K: PropertyKey, T> IndexMut<K> for PropertyVec<K, T> {
    #[inline]
    fn index_mut(&mut self, key: K) -> &mut T {
        &mut self.data[key.slot()]
    }
}

impl<K: PropertyKey, T: fmt::Debug> fmt::Debug for PropertyVec<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyVec")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .field("default", &self.default)
            .finish()
    }
}

impl<K, T> PropertyArray for PropertyVec<K, T>
where
    K: PropertyKey,
    T: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn reserve(&mut self, additional: usize) {
        self.data.reserve(additional);
    }

    fn resize(&mut self, n: usize) {
        self.data.resize(n, self.default.clone());
    }

    fn push(&mut self) {
        self.data.push(self.default.clone());
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.data.swap(i, j);
    }

    fn copy(&mut self, from: usize, to: usize) {
        if from != to {
            self.data[to] = self.data[from].clone();
        }
    }

    fn shrink_to_fit(&mut self) {
        self.data.shrink_to_fit();
    }

    fn clone_box(&self) -> Box<dyn PropertyArray> {
        Box::new(Self {
            name: self.name.clone(),
            data: self.data.clone(),
            default: self.default.clone(),
            _marker: PhantomData,
        })
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Typed handle to a property registered in a [`PropertyContainer`].
///
/// Handles stay valid across element insertion, deletion and garbage
/// collection; they become stale only when the property is removed.
pub struct Property<K, T> {
    slot: usize,
    _marker: PhantomData<fn() -> (K, T)>,
}

impl<K, T> Property<K, T> {
    fn new(slot: usize) -> Self {
        Self {
            slot,
            _marker: PhantomData,
        }
    }
}

impl<K, T> Clone for Property<K, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, T> Copy for Property<K, T> {}

impl<K, T> PartialEq for Property<K, T> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl<K, T> Eq for Property<K, T> {}

impl<K, T> fmt::Debug for Property<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property({})", self.slot)
    }
}

/// Handle to a per-vertex property.
pub type VertexProperty<T> = Property<VertexId, T>;
/// Handle to a per-halfedge property.
pub type HalfEdgeProperty<T> = Property<HalfEdgeId, T>;
/// Handle to a per-edge property.
pub type EdgeProperty<T> = Property<EdgeId, T>;
/// Handle to a per-face property.
pub type FaceProperty<T> = Property<FaceId, T>;
/// Handle to a model-level property.
pub type ModelProperty<T> = Property<Model, T>;

/// All properties of one element kind.
pub struct PropertyContainer<K> {
    arrays: Vec<Option<Box<dyn PropertyArray>>>,
    len: usize,
    _marker: PhantomData<fn(K)>,
}

impl<K: PropertyKey> PropertyContainer<K> {
    /// Create an empty container sized for `len` elements.
    pub fn new(len: usize) -> Self {
        Self {
            arrays: Vec::new(),
            len,
            _marker: PhantomData,
        }
    }

    /// Number of elements every array holds.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the element count is zero.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of registered properties.
    pub fn num_properties(&self) -> usize {
        self.arrays.iter().flatten().count()
    }

    fn slot_of(&self, name: &str) -> Option<usize> {
        self.arrays
            .iter()
            .position(|a| a.as_ref().is_some_and(|a| a.name() == name))
    }

    /// Register a new property. Fails if the name is already taken.
    pub fn add<T>(&mut self, name: &str, default: T) -> Result<Property<K, T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        if self.slot_of(name).is_some() {
            return Err(MeshError::DuplicateProperty {
                name: name.to_string(),
            });
        }
        let array: Box<dyn PropertyArray> = Box::new(PropertyVec::<K, T>::new(name, default, self.len));
        let slot = match self.arrays.iter().position(Option::is_none) {
            Some(free) => {
                self.arrays[free] = Some(array);
                free
            }
            None => {
                self.arrays.push(Some(array));
                self.arrays.len() - 1
            }
        };
        Ok(Property::new(slot))
    }

    /// Look up a property by name and type.
    pub fn get<T>(&self, name: &str) -> Option<Property<K, T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let slot = self.slot_of(name)?;
        let array = self.arrays[slot].as_ref()?;
        array
            .as_any()
            .is::<PropertyVec<K, T>>()
            .then(|| Property::new(slot))
    }

    /// Look up a property, registering it when absent.
    ///
    /// Fails if the name is taken by a property of a different type.
    pub fn get_or_add<T>(&mut self, name: &str, default: T) -> Result<Property<K, T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        if let Some(p) = self.get(name) {
            return Ok(p);
        }
        match self.type_name_of(name) {
            Some(found) => Err(MeshError::PropertyTypeMismatch {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
                found,
            }),
            None => self.add(name, default),
        }
    }

    /// Remove a property. Removing a stale handle is a no-op.
    pub fn remove<T>(&mut self, p: Property<K, T>) {
        if let Some(entry) = self.arrays.get_mut(p.slot) {
            *entry = None;
        }
    }

    /// Whether a property with this name exists (of any type).
    pub fn exists(&self, name: &str) -> bool {
        self.slot_of(name).is_some()
    }

    /// Names of all registered properties.
    pub fn names(&self) -> Vec<String> {
        self.arrays
            .iter()
            .flatten()
            .map(|a| a.name().to_string())
            .collect()
    }

    /// Type name of the named property, if registered.
    pub fn type_name_of(&self, name: &str) -> Option<&'static str> {
        let slot = self.slot_of(name)?;
        self.arrays[slot].as_ref().map(|a| a.type_name())
    }

    /// Typed access, `None` for a stale handle.
    pub fn try_get<T: 'static>(&self, p: Property<K, T>) -> Option<&PropertyVec<K, T>> {
        self.arrays
            .get(p.slot)?
            .as_ref()?
            .as_any()
            .downcast_ref::<PropertyVec<K, T>>()
    }

    /// Mutable typed access, `None` for a stale handle.
    pub fn try_get_mut<T: 'static>(&mut self, p: Property<K, T>) -> Option<&mut PropertyVec<K, T>> {
        self.arrays
            .get_mut(p.slot)?
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<PropertyVec<K, T>>()
    }

    /// Typed access.
    ///
    /// # Panics
    /// Panics if the property has been removed.
    pub fn get_array<T: 'static>(&self, p: Property<K, T>) -> &PropertyVec<K, T> {
        match self.try_get(p) {
            Some(array) => array,
            None => panic!("stale property handle {:?}", p),
        }
    }

    /// Mutable typed access.
    ///
    /// # Panics
    /// Panics if the property has been removed.
    pub fn get_array_mut<T: 'static>(&mut self, p: Property<K, T>) -> &mut PropertyVec<K, T> {
        match self.try_get_mut(p) {
            Some(array) => array,
            None => panic!("stale property handle {:?}", p),
        }
    }

    // ==================== Lockstep maintenance ====================

    /// Resize every array to `n` entries.
    pub fn resize(&mut self, n: usize) {
        for array in self.arrays.iter_mut().flatten() {
            array.resize(n);
        }
        self.len = n;
    }

    /// Append one default entry to every array.
    pub fn push(&mut self) {
        for array in self.arrays.iter_mut().flatten() {
            array.push();
        }
        self.len += 1;
    }

    /// Reserve room in every array.
    pub fn reserve(&mut self, additional: usize) {
        for array in self.arrays.iter_mut().flatten() {
            array.reserve(additional);
        }
    }

    /// Swap two entries in every array.
    pub fn swap(&mut self, i: usize, j: usize) {
        for array in self.arrays.iter_mut().flatten() {
            array.swap(i, j);
        }
    }

    /// Copy entry `from` over entry `to` in every array.
    pub fn copy(&mut self, from: usize, to: usize) {
        for array in self.arrays.iter_mut().flatten() {
            array.copy(from, to);
        }
    }

    /// Release unused capacity in every array.
    pub fn shrink_to_fit(&mut self) {
        for array in self.arrays.iter_mut().flatten() {
            array.shrink_to_fit();
        }
    }

    /// Remove every property.
    pub fn clear(&mut self) {
        self.arrays.clear();
    }
}

impl<K> Clone for PropertyContainer<K> {
    fn clone(&self) -> Self {
        Self {
            arrays: self
                .arrays
                .iter()
                .map(|a| a.as_ref().map(|a| a.clone_box()))
                .collect(),
            len: self.len,
            _marker: PhantomData,
        }
    }
}

impl<K> fmt::Debug for PropertyContainer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<(&str, &'static str)> = self
            .arrays
            .iter()
            .flatten()
            .map(|a| (a.name(), a.type_name()))
            .collect();
        f.debug_struct("PropertyContainer")
            .field("len", &self.len)
            .field("properties", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut c: PropertyContainer<VertexId> = PropertyContainer::new(3);
        let p = c.add("v:weight", 2.0_f64).unwrap();
        assert_eq!(c.get_array(p).len(), 3);
        assert_eq!(c.get_array(p)[VertexId::new(1)], 2.0);

        assert_eq!(c.get::<f64>("v:weight"), Some(p));
        assert!(c.get::<i32>("v:weight").is_none());
        assert!(c.get::<f64>("v:missing").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut c: PropertyContainer<FaceId> = PropertyContainer::new(0);
        c.add("f:tag", 0_u8).unwrap();
        assert!(matches!(
            c.add("f:tag", 1_u8),
            Err(MeshError::DuplicateProperty { .. })
        ));
        assert!(c.get_or_add("f:tag", 7_u8).is_ok());
        assert!(matches!(
            c.get_or_add("f:tag", 0.0_f32),
            Err(MeshError::PropertyTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_lockstep_growth_and_swap() {
        let mut c: PropertyContainer<VertexId> = PropertyContainer::new(0);
        let a = c.add("a", 0_i32).unwrap();
        let b = c.add("b", String::from("x")).unwrap();

        c.push();
        c.push();
        c.get_array_mut(a)[VertexId::new(0)] = 10;
        c.get_array_mut(a)[VertexId::new(1)] = 20;
        c.get_array_mut(b)[VertexId::new(1)] = "y".into();

        c.swap(0, 1);
        assert_eq!(c.get_array(a).as_slice(), &[20, 10]);
        assert_eq!(c.get_array(b)[VertexId::new(0)], "y");

        c.copy(0, 1);
        assert_eq!(c.get_array(a).as_slice(), &[20, 20]);

        c.resize(4);
        assert_eq!(c.len(), 4);
        assert_eq!(c.get_array(a)[VertexId::new(3)], 0);
    }

    #[test]
    fn test_remove_reuses_slot() {
        let mut c: PropertyContainer<EdgeId> = PropertyContainer::new(2);
        let a = c.add("e:a", true).unwrap();
        c.remove(a);
        assert!(!c.exists("e:a"));
        assert!(c.try_get(a).is_none());

        let b = c.add("e:b", 1.5_f64).unwrap();
        assert_eq!(c.num_properties(), 1);
        assert_eq!(c.names(), vec!["e:b".to_string()]);
        assert_eq!(c.type_name_of("e:b"), Some("f64"));
        assert_eq!(c.get_array(b).len(), 2);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut c: PropertyContainer<VertexId> = PropertyContainer::new(1);
        let p = c.add("v:x", 1_u32).unwrap();
        let copy = c.clone();
        c.get_array_mut(p)[VertexId::new(0)] = 99;
        assert_eq!(copy.get_array(p)[VertexId::new(0)], 1);
    }

    #[test]
    fn test_model_property() {
        let mut c: PropertyContainer<Model> = PropertyContainer::new(1);
        let p = c.add("m:name", String::new()).unwrap();
        c.get_array_mut(p)[Model] = "bunny".into();
        assert_eq!(c.get_array(p)[Model], "bunny");
    }
}
