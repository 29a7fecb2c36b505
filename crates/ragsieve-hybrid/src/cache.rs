//! Per-scope cache of constructed retrievers.
//!
//! At most one build runs per scope. Readers keep getting the previous
//! instance until a rebuild finishes and is swapped in. Eviction clears a
//! slot but never removes it, so a build in flight keeps holding the scope's
//! only build lock; its result is discarded if the slot was evicted meanwhile.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use ragsieve_core::error::Result;

use crate::retriever::HybridRetriever;

struct ScopeSlot<T> {
	current: RwLock<Option<Arc<T>>>,
	build: Mutex<()>,
	/// Bumped on every eviction.
	epoch: AtomicU64,
}

impl<T> Default for ScopeSlot<T> {
	fn default() -> Self { Self { current: RwLock::new(None), build: Mutex::new(()), epoch: AtomicU64::new(0) } }
}

impl<T> ScopeSlot<T> {
	/// Installs `built` unless the slot was evicted after `epoch` was read.
	fn install(&self, epoch: u64, built: &Arc<T>) -> bool {
		let mut current = self.current.write();
		if self.epoch.load(Ordering::SeqCst) != epoch { return false; }
		*current = Some(built.clone());
		true
	}

	fn evict(&self) -> bool {
		let mut current = self.current.write();
		self.epoch.fetch_add(1, Ordering::SeqCst);
		current.take().is_some()
	}
}

#[derive(Debug)]
pub enum RebuildOutcome<T> {
	Rebuilt(Arc<T>),
	/// Another build for the scope was in flight; nothing was built.
	AlreadyBuilding,
}

pub struct RetrieverCache<T = HybridRetriever> {
	slots: Mutex<HashMap<String, Arc<ScopeSlot<T>>>>,
}

impl<T> Default for RetrieverCache<T> {
	fn default() -> Self { Self { slots: Mutex::new(HashMap::new()) } }
}

impl<T> RetrieverCache<T> {
	pub fn new() -> Self { Self::default() }

	fn slot(&self, scope: &str) -> Arc<ScopeSlot<T>> {
		self.slots.lock().entry(scope.to_string()).or_default().clone()
	}

	pub fn get(&self, scope: &str) -> Option<Arc<T>> {
		let slot = self.slots.lock().get(scope).cloned()?;
		let current = slot.current.read().clone();
		current
	}

	/// Returns the cached instance, building it if absent. Concurrent callers
	/// for the same scope wait for the single in-flight build. Failed builds
	/// are not cached.
	pub fn get_or_build<F>(&self, scope: &str, build: F) -> Result<Arc<T>>
	where
		F: FnOnce() -> Result<T>,
	{
		let slot = self.slot(scope);
		if let Some(existing) = slot.current.read().clone() { return Ok(existing); }
		let _guard = slot.build.lock();
		if let Some(existing) = slot.current.read().clone() { return Ok(existing); }
		let epoch = slot.epoch.load(Ordering::SeqCst);
		let built = Arc::new(build().inspect_err(|e| warn!(scope, error = %e, "retriever build failed"))?);
		if slot.install(epoch, &built) {
			info!(scope, "retriever cached");
		} else {
			info!(scope, "scope evicted during build, result not cached");
		}
		Ok(built)
	}

	/// Builds a fresh instance and swaps it in. Readers see the old instance
	/// meanwhile; on failure the old instance stays.
	pub fn rebuild<F>(&self, scope: &str, build: F) -> Result<RebuildOutcome<T>>
	where
		F: FnOnce() -> Result<T>,
	{
		let slot = self.slot(scope);
		let Some(_guard) = slot.build.try_lock() else {
			info!(scope, "rebuild already in flight");
			return Ok(RebuildOutcome::AlreadyBuilding);
		};
		let epoch = slot.epoch.load(Ordering::SeqCst);
		let built = Arc::new(build().inspect_err(|e| warn!(scope, error = %e, "retriever rebuild failed"))?);
		if slot.install(epoch, &built) {
			info!(scope, "retriever rebuilt");
		} else {
			info!(scope, "scope evicted during rebuild, result not cached");
		}
		Ok(RebuildOutcome::Rebuilt(built))
	}

	/// Drops the cached instance. Returns whether one was cached.
	pub fn evict(&self, scope: &str) -> bool {
		self.slots.lock().get(scope).is_some_and(|slot| slot.evict())
	}

	/// Drops every scope except `scope`.
	pub fn retain_only(&self, scope: &str) {
		for (_, slot) in self.slots.lock().iter().filter(|(k, _)| k.as_str() != scope) { slot.evict(); }
	}

	pub fn clear(&self) {
		for slot in self.slots.lock().values() { slot.evict(); }
	}

	pub fn scopes(&self) -> Vec<String> {
		let mut scopes: Vec<String> = self.slots.lock().iter().filter(|(_, s)| s.current.read().is_some()).map(|(k, _)| k.clone()).collect();
		scopes.sort();
		scopes
	}
}
