/// Implement the listed [Tunable](crate::tune::Tunable) methods by forwarding them to a field.
///
/// Strategies wrap a kernel and only override the axes they change, everything else is
/// forwarded with this macro inside the `impl Tunable` block.
macro_rules! forward_tunable {
    ($field:ident; $($method:ident),* $(,)?) => {
        $(forward_tunable!(@method $field $method);)*
    };
    (@method $field:ident flops) => {
        fn flops(&self) -> u64 {
            self.$field.flops()
        }
    };
    (@method $field:ident bytes) => {
        fn bytes(&self) -> u64 {
            self.$field.bytes()
        }
    };
    (@method $field:ident shared_bytes_per_thread) => {
        fn shared_bytes_per_thread(&self) -> u32 {
            self.$field.shared_bytes_per_thread()
        }
    };
    (@method $field:ident shared_bytes_per_block) => {
        fn shared_bytes_per_block(&self, param: &$crate::tune::TuneParam) -> u32 {
            self.$field.shared_bytes_per_block(param)
        }
    };
    (@method $field:ident min_threads) => {
        fn min_threads(&self) -> u32 {
            self.$field.min_threads()
        }
    };
    (@method $field:ident tune_grid_dim) => {
        fn tune_grid_dim(&self) -> bool {
            self.$field.tune_grid_dim()
        }
    };
    (@method $field:ident tune_aux_dim) => {
        fn tune_aux_dim(&self) -> bool {
            self.$field.tune_aux_dim()
        }
    };
    (@method $field:ident tune_shared_bytes) => {
        fn tune_shared_bytes(&self) -> bool {
            self.$field.tune_shared_bytes()
        }
    };
    (@method $field:ident max_block_size) => {
        fn max_block_size(&self, ctx: &$crate::tune::TuneContext) -> u32 {
            self.$field.max_block_size(ctx)
        }
    };
    (@method $field:ident block_step) => {
        fn block_step(&self, ctx: &$crate::tune::TuneContext) -> u32 {
            self.$field.block_step(ctx)
        }
    };
    (@method $field:ident block_min) => {
        fn block_min(&self, ctx: &$crate::tune::TuneContext) -> u32 {
            self.$field.block_min(ctx)
        }
    };
    (@method $field:ident tune_key) => {
        fn tune_key(&self) -> $crate::tune::TuneKey {
            self.$field.tune_key()
        }
    };
    (@method $field:ident apply) => {
        fn apply(
            &mut self,
            param: &$crate::tune::TuneParam,
            stream: &Self::Stream,
        ) -> Result<(), $crate::tune::LaunchError> {
            self.$field.apply(param, stream)
        }
    };
    (@method $field:ident pre_tune) => {
        fn pre_tune(&mut self) {
            self.$field.pre_tune()
        }
    };
    (@method $field:ident post_tune) => {
        fn post_tune(&mut self) {
            self.$field.post_tune()
        }
    };
    (@method $field:ident tuning_iter) => {
        fn tuning_iter(&self) -> u32 {
            self.$field.tuning_iter()
        }
    };
    (@method $field:ident param_string) => {
        fn param_string(&self, param: &$crate::tune::TuneParam) -> String {
            self.$field.param_string(param)
        }
    };
    (@method $field:ident perf_string) => {
        fn perf_string(&self, time: f64) -> String {
            self.$field.perf_string(time)
        }
    };
    (@method $field:ident advance_grid_dim) => {
        fn advance_grid_dim(
            &self,
            param: &mut $crate::tune::TuneParam,
            ctx: &$crate::tune::TuneContext,
        ) -> bool {
            self.$field.advance_grid_dim(param, ctx)
        }
    };
    (@method $field:ident advance_shared_bytes) => {
        fn advance_shared_bytes(
            &self,
            param: &mut $crate::tune::TuneParam,
            ctx: &$crate::tune::TuneContext,
        ) -> Result<bool, $crate::tune::TuneError> {
            self.$field.advance_shared_bytes(param, ctx)
        }
    };
    (@method $field:ident advance_aux) => {
        fn advance_aux(
            &self,
            param: &mut $crate::tune::TuneParam,
            ctx: &$crate::tune::TuneContext,
        ) -> bool {
            self.$field.advance_aux(param, ctx)
        }
    };
}

mod local_parity;
mod vector_y;
mod vector_yz;

pub use local_parity::*;
pub use vector_y::*;
pub use vector_yz::*;
