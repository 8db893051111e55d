//! 处理器工厂（Handler Factory）
//!
//! 为一次分发组装完整的处理链：从业务处理器开始，按标记声明顺序的**逆序**逐层包裹，
//! 因此第一个声明的标记位于最外层、最先执行。未映射装饰器的标记被忽略。
//!
use crate::{
    decorator::DecoratorMap, error::AppError, pipeline::RequestHandler,
    registry::HandlerDescriptor, services::ServiceScope,
};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct HandlerFactory {
    decorators: Arc<DecoratorMap>,
}

impl HandlerFactory {
    pub fn new(decorators: DecoratorMap) -> Self {
        Self {
            decorators: Arc::new(decorators),
        }
    }

    pub fn decorators(&self) -> &DecoratorMap {
        &self.decorators
    }

    /// 组装处理链；依赖缺失等配置错误原样返回
    pub fn build_chain(
        &self,
        descriptor: &HandlerDescriptor,
        scope: &ServiceScope,
    ) -> Result<Arc<dyn RequestHandler>, AppError> {
        let business = descriptor.business_handler(scope)?;

        descriptor
            .markers()
            .iter()
            .rev()
            .try_fold(business, |inner, marker| {
                match self.decorators.decorate(marker, inner.clone(), scope, descriptor) {
                    Some(decorated) => decorated,
                    None => Ok(inner),
                }
            })
    }
}
