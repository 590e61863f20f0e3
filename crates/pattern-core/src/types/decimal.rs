//! 정밀한 가격 계산을 위한 Decimal 유틸리티.

use rust_decimal::Decimal;

/// 가격 타입.
pub type Price = Decimal;

/// 거래량 타입.
pub type Volume = Decimal;

/// Decimal 연산을 위한 확장 트레이트.
pub trait DecimalExt {
    /// 기준값 대비 변화율(%)을 반환합니다. 기준값이 0이면 0을 반환합니다.
    fn percent_change_from(&self, base: Decimal) -> Decimal;
}

impl DecimalExt for Decimal {
    fn percent_change_from(&self, base: Decimal) -> Decimal {
        if base.is_zero() {
            return Decimal::ZERO;
        }
        (*self - base) / base * Decimal::ONE_HUNDRED
    }
}
