//! 메시지 분할과 조립
//!
//! - 송신측: 큰 Message body 를 같은 transaction id 를 공유하는 MessageFragment 들로 분할
//! - 수신측: index 로 정렬/중복제거하며 모아서, 모두 모이면 index 순서대로 이어붙임

use std::collections::BTreeMap;

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::header::{DataType, Header};
use crate::package::Package;
use crate::transaction::TransactionId;
use crate::{Error, Result, MAX_PAGES};

/// 패키지를 fragment 들로 분할
///
/// body 가 `max_fragment_body_size` 이하이면 원래 패키지를 그대로 돌려준다 (pages=1).
pub fn split(package: Package, max_fragment_body_size: usize) -> Result<Vec<Package>> {
    debug_assert!(max_fragment_body_size > 0);
    if package.body.len() <= max_fragment_body_size {
        return Ok(vec![package]);
    }

    let pages = (package.body.len() + max_fragment_body_size - 1) / max_fragment_body_size;
    if pages > MAX_PAGES as usize {
        return Err(Error::PagesOutOfRange {
            pages: pages.min(u32::MAX as usize) as u32,
        });
    }
    let pages = pages as u32;

    let transaction_id = if package.transaction_id().is_zero() {
        TransactionId::generate()
    } else {
        package.transaction_id()
    };

    let body = package.body;
    (0..pages)
        .map(|index| {
            let start = index as usize * max_fragment_body_size;
            let end = (start + max_fragment_body_size).min(body.len());
            Package::create(
                DataType::MessageFragment,
                transaction_id,
                pages,
                index,
                body.slice(start..end),
            )
        })
        .collect()
}

/// fragment 삽입 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// 저장됨, 아직 미완성
    Pending,

    /// 이미 받은 index
    Duplicate,

    /// 이 조립에 속하지 않거나 범위를 벗어난 fragment
    Rejected,

    /// 조립 완료 (완료 이후 삽입도 같은 패키지를 돌려줌)
    Complete(Package),
}

/// 한 transaction 의 fragment 조립 상태
#[derive(Debug)]
pub struct Assembly {
    transaction_id: TransactionId,
    pages: u32,
    fragments: BTreeMap<u32, Bytes>,
    completed: Option<Package>,
}

impl Assembly {
    /// 첫 fragment 의 transaction id / pages 로 조립 상태 생성
    pub fn new(transaction_id: TransactionId, pages: u32) -> Self {
        debug_assert!(pages > 0, "pages=0 fragment 는 코덱에서 걸러져야 함");
        Self {
            transaction_id,
            pages,
            fragments: BTreeMap::new(),
            completed: None,
        }
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn pages(&self) -> u32 {
        self.pages
    }

    /// 받은 fragment 수
    pub fn received(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_complete(&self) -> bool {
        self.completed.is_some()
    }

    /// 아직 받지 못한 index 목록
    pub fn missing_indexes(&self) -> Vec<u32> {
        (0..self.pages)
            .filter(|index| !self.fragments.contains_key(index))
            .collect()
    }

    /// fragment 삽입
    pub fn insert(&mut self, fragment: &Package) -> InsertOutcome {
        if let Some(completed) = &self.completed {
            return InsertOutcome::Complete(completed.clone());
        }

        let index = fragment.index();
        if fragment.transaction_id() != self.transaction_id
            || fragment.pages() != self.pages
            || self.pages == 0
            || index >= self.pages
        {
            return InsertOutcome::Rejected;
        }

        if self.fragments.contains_key(&index) {
            trace!("중복 fragment: {} [{}/{}]", self.transaction_id, index, self.pages);
            return InsertOutcome::Duplicate;
        }
        self.fragments.insert(index, fragment.body.clone());

        if self.fragments.len() < self.pages as usize {
            return InsertOutcome::Pending;
        }

        let package = self.join();
        self.fragments.clear();
        self.completed = Some(package.clone());
        InsertOutcome::Complete(package)
    }

    /// index 순서대로 body 를 이어붙여 Message 패키지 생성
    fn join(&self) -> Package {
        let total: usize = self.fragments.values().map(|body| body.len()).sum();
        let mut body = BytesMut::with_capacity(total);
        for fragment in self.fragments.values() {
            body.extend_from_slice(fragment);
        }

        let header = Header::single(DataType::Message, self.transaction_id);
        Package {
            header,
            body: body.freeze(),
        }
    }
}
